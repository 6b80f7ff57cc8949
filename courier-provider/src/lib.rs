pub mod manual;
pub mod kwik;
pub mod factory;

pub use manual::ManualProvider;
pub use kwik::{KwikConfig, KwikProvider};
pub use factory::ProviderFactory;
