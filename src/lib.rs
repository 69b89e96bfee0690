pub mod common;
pub mod domains;

pub use common::eref::ERef;
pub use common::uuid::{ModelUuid, ViewUuid};
