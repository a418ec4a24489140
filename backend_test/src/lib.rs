use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{parse_macro_input, spanned::Spanned, FnArg, ItemFn, Pat, Signature, Type};

/// Transform an asynchronous test into a synchronous one, inject dependencies,
/// and ensure that the snapshot file is removed regardless of how the test terminates.
///
/// Injectable dependencies are [`rocket::local::asynchronous::Client`],
/// [`crate::model::SharedLedger`], [`crate::clock::ManualClock`] (the clock the
/// server reads, initially the time of setup) and [`std::path::PathBuf`] (the
/// snapshot file).
#[proc_macro_attribute]
pub fn backend_test(_args: TokenStream, input: TokenStream) -> TokenStream {
    let mut item_fn = parse_macro_input!(input as ItemFn);

    // Extract the injected arguments and reject invalid function signatures.
    let test_args = match check_sig(item_fn.sig.clone()) {
        Ok(args) => args,
        Err(err) => {
            return err.into_compile_error().into();
        }
    };

    // Rename the future so the test can have its original name.
    let name = item_fn.sig.ident.clone();
    let new_name = format_ident!("{}_fut", name);
    item_fn.sig.ident = new_name.clone();

    // Rewrite the test function.
    quote! {
        #[test]
        #[allow(unused_variables)]
        fn #name() {
            /// Test setup.
            async fn setup() -> (
                rocket::local::asynchronous::Client,
                crate::model::SharedLedger,
                crate::clock::ManualClock,
                std::path::PathBuf,
            ) {
                log4rs_test_utils::test_logging::init_logging_once_for(["poll_ledger"], None, None);
                let snapshot = crate::test_snapshot_path();
                let ledger = crate::model::Ledger::load(crate::model::JsonFileStore::new(&snapshot))
                    .unwrap()
                    .shared();
                let clock = crate::clock::ManualClock::new(chrono::Utc::now());
                let shared_clock: crate::clock::SharedClock = std::sync::Arc::new(clock.clone());
                let rocket_client = rocket::local::asynchronous::Client::tracked(crate::rocket_for_ledger(ledger.clone(), shared_clock))
                    .await
                    .unwrap();

                (rocket_client, ledger, clock, snapshot)
            }

            /// The test itself.
            #item_fn

            /// Test cleanup.
            async fn cleanup(snapshot: std::path::PathBuf) {
                // The file only exists if the test changed something.
                let _ = rocket::tokio::fs::remove_file(snapshot).await;
            }

            // Create an async runtime. We need a separate one for inside and
            // outside the `catch_unwind`.
            let outer_runtime = rocket::tokio::runtime::Builder::new_multi_thread()
                .thread_name("test-setup-cleanup")
                .worker_threads(1)
                .enable_all()
                .build()
                .unwrap();
            let inner_runtime = rocket::tokio::runtime::Builder::new_multi_thread()
                .thread_name("rocket-worker-test-thread")
                .worker_threads(1)
                .enable_all()
                .build()
                .unwrap();

            // Run the setup.
            let (rocket_client, ledger, clock, snapshot) = outer_runtime.block_on(setup());

            // Run the test, catching any panics.
            // Use mutexes to safely transfer `!UnwindSafe` data.
            let client_mutex = std::sync::Mutex::new(rocket_client);
            let ledger_mutex = std::sync::Mutex::new(ledger);
            let clock_mutex = std::sync::Mutex::new(clock);
            let snapshot_mutex = std::sync::Mutex::new(snapshot.clone());
            let runtime_mutex = std::sync::Mutex::new(inner_runtime);
            let result = std::panic::catch_unwind(|| {
                let rocket_client = client_mutex.into_inner().unwrap();
                let ledger = ledger_mutex.into_inner().unwrap();
                let clock = clock_mutex.into_inner().unwrap();
                let snapshot = snapshot_mutex.into_inner().unwrap();
                let runtime = runtime_mutex.into_inner().unwrap();

                runtime.block_on(#new_name(#(#test_args),*));
            });

            // Run the cleanup.
            outer_runtime.block_on(cleanup(snapshot));

            // If the test panicked, re-raise the panic.
            if let Err(cause) = result {
                std::panic::panic_any(cause);
            }
        }
    }
    .into()
}

/// Ensure the wrapped test is async, extract parameters to inject, and reject unknown parameters.
fn check_sig(sig: Signature) -> Result<Vec<TokenStream2>, syn::Error> {
    if sig.asyncness.is_none() {
        return Err(syn::Error::new(sig.span(), "Test must be marked `async`"));
    }

    let injectable = [
        ("Client", quote! { rocket_client }),
        ("SharedLedger", quote! { ledger }),
        ("ManualClock", quote! { clock }),
        ("PathBuf", quote! { snapshot }),
    ];
    let mut seen = vec![];
    let mut args = vec![];

    for input in &sig.inputs {
        if let FnArg::Typed(pat_type) = input {
            if let (Pat::Ident(_), Type::Path(type_path)) = (&*pat_type.pat, &*pat_type.ty) {
                if let Some(type_ident) = type_path.path.get_ident() {
                    if let Some((name, arg)) =
                        injectable.iter().find(|(name, _)| type_ident == name)
                    {
                        if seen.contains(name) {
                            return Err(syn::Error::new(
                                input.span(),
                                format!("Test cannot accept more than one `{name}`"),
                            ));
                        }
                        seen.push(*name);
                        args.push(arg.clone());
                        continue;
                    }
                }
            }
        }

        return Err(syn::Error::new(
            input.span(),
            "Expected one of `client_ident: Client`, `ledger_ident: SharedLedger`, `clock_ident: ManualClock` or `snapshot_ident: PathBuf`",
        ));
    }

    Ok(args)
}
