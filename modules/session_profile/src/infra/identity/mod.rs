pub mod gotrue;
pub mod memory;

pub use gotrue::GoTrueIdentityProvider;
pub use memory::MemoryIdentityProvider;
