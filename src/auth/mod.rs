pub mod sigv4;

pub use sigv4::{SigV4Credentials, SigV4Signer, SigV4Timestamp};
