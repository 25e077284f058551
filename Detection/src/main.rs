#![allow(non_snake_case)]

use DetectionLibrary::detection::Detection;

#[actix_web::main]
async fn main() {
    Detection::run().await;
    Detection::terminate().await;
}
