#![allow(dead_code)]

pub mod process_guard;
pub mod server_guard;

#[allow(unused_imports)]
pub use process_guard::{start_server_process, ServerProcess};
#[allow(unused_imports)]
pub use server_guard::{test_now, TestServer};
