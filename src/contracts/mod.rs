// Contracts Module - ABIs of on-chain helpers queried during attribution

pub mod ether_router;
pub mod gas_price_oracle;
pub mod router_resolver;

pub use ether_router::{EtherRouter, ResolverCall, ResolverReturn};
pub use gas_price_oracle::{GasPriceOracle, GetL1FeeCall, GetL1FeeReturn};
pub use router_resolver::{LookupCall, LookupReturn, RouterResolver};
