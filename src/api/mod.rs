use rocket::Route;

mod common;
mod polls;
mod registration;
mod voting;

pub fn routes() -> Vec<Route> {
    let mut routes = Vec::new();
    routes.extend(polls::routes());
    routes.extend(registration::routes());
    routes.extend(voting::routes());
    routes
}
