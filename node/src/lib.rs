pub mod block_index;
pub mod chain;
pub mod difficulty;
pub mod error_code;
pub mod ledger;
pub mod prevalidate;
pub mod stores;
pub mod traits;
pub mod validation;

fn _version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
fn _pkg_name() -> &'static str {
    env!("CARGO_PKG_NAME")
}

pub fn version() -> String {
    format!("{}: {}", _pkg_name(), _version())
}
