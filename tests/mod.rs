mod common;

mod delivery_tests;
mod model_tests;
mod redis_tests;
mod worker_tests;
