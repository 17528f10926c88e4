mod error;
mod identity;
mod pubkey;
mod relayspec;

pub use error::Error;
pub use identity::NormRelayUrl;
pub use pubkey::Pubkey;
pub use relayspec::RelaySpec;

pub type Result<T> = std::result::Result<T, Error>;
