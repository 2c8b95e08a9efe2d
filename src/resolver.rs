//! # Identity Resolver
//!
//! Maps a call to a contract name when the target address alone does not explain the
//! called method. Strategies are tried in a fixed order and the first one that yields
//! a name wins:
//!
//! 1. [`ResolutionStrategy::DirectBind`]: address bound in the cache and the bound
//!    contract has the selector.
//! 2. [`ResolutionStrategy::Proxy`]: address bound, selector unknown to the bound
//!    contract. Delegated to a [`ProxyResolver`].
//! 3. [`ResolutionStrategy::DeployedBytecode`]: address unbound. The code at the address
//!    is compared against every catalog runtime bytecode; a match is bound for the rest
//!    of the unit. RPC failures count as "no match".
//! 4. [`ResolutionStrategy::MethodSignature`]: first contract in catalog order exposing
//!    the selector. Ambiguous when several unrelated contracts share a selector; ties go
//!    to the first registered contract.

use crate::bytecode::selector_of;
use crate::chain::ChainClient;
use crate::contracts::{LookupCall, LookupReturn, ResolverCall, ResolverReturn};
use crate::ledger::GasLedger;
use crate::metrics;
use async_trait::async_trait;
use ethers::abi::{AbiDecode, AbiEncode};
use ethers::types::Address;
use log::{debug, warn};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResolutionStrategy {
    DirectBind,
    Proxy,
    DeployedBytecode,
    MethodSignature,
}

impl ResolutionStrategy {
    /// Precedence, strongest first.
    pub const ORDER: [Self; 4] = [
        Self::DirectBind,
        Self::Proxy,
        Self::DeployedBytecode,
        Self::MethodSignature,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DirectBind => "direct_bind",
            Self::Proxy => "proxy",
            Self::DeployedBytecode => "deployed_bytecode",
            Self::MethodSignature => "method_signature",
        }
    }
}

/// Outcome of a successful resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub contract: String,
    pub strategy: ResolutionStrategy,
    /// Address the scanner should bind to `contract` for the rest of the unit
    pub bind: Option<Address>,
}

/// The call being resolved.
#[derive(Debug, Clone, Copy)]
pub struct CallTarget<'a> {
    pub to: Address,
    pub input: &'a [u8],
    /// Name currently bound to `to`, if any
    pub bound: Option<&'a str>,
}

/// Finds the implementation behind a proxied call.
#[async_trait]
pub trait ProxyResolver: Send + Sync {
    fn name(&self) -> &'static str;

    async fn resolve(&self, ledger: &GasLedger, call: CallTarget<'_>) -> Option<String>;
}

/// The implementation is the only catalog contract exposing the called selector.
#[derive(Debug, Default, Clone, Copy)]
pub struct UniqueSelectorResolver;

#[async_trait]
impl ProxyResolver for UniqueSelectorResolver {
    fn name(&self) -> &'static str {
        "unique_selector"
    }

    async fn resolve(&self, ledger: &GasLedger, call: CallTarget<'_>) -> Option<String> {
        let selector = selector_of(call.input)?;
        match ledger.contracts_with_selector(&selector).as_slice() {
            [only] => Some(only.to_string()),
            [] => None,
            many => {
                debug!(
                    "Proxy call to {:?}: selector shared by {} contracts, not unique",
                    call.to,
                    many.len()
                );
                None
            }
        }
    }
}

/// EtherRouter proxies: ask the router for its resolver, ask the resolver for the
/// implementation of the selector, then identify the implementation by its code.
pub struct EtherRouterResolver {
    client: Arc<dyn ChainClient>,
}

impl EtherRouterResolver {
    pub fn new(client: Arc<dyn ChainClient>) -> Self {
        Self { client }
    }

    async fn implementation(&self, router: Address, selector: [u8; 4]) -> Option<Address> {
        let raw = self
            .client
            .call(router, ResolverCall.encode().into())
            .await
            .map_err(|e| warn!("⚠️ EtherRouter resolver() failed for {:?}: {}", router, e))
            .ok()?;
        let resolver = ResolverReturn::decode(raw.as_ref()).ok()?.0;

        let raw = self
            .client
            .call(resolver, LookupCall { sig: selector }.encode().into())
            .await
            .map_err(|e| warn!("⚠️ EtherRouter lookup() failed on {:?}: {}", resolver, e))
            .ok()?;
        let implementation = LookupReturn::decode(raw.as_ref()).ok()?.0;
        (!implementation.is_zero()).then_some(implementation)
    }
}

#[async_trait]
impl ProxyResolver for EtherRouterResolver {
    fn name(&self) -> &'static str {
        "ether_router"
    }

    async fn resolve(&self, ledger: &GasLedger, call: CallTarget<'_>) -> Option<String> {
        let selector = selector_of(call.input)?;
        let implementation = self.implementation(call.to, selector).await?;
        let code = self
            .client
            .code_at(implementation)
            .await
            .map_err(|e| warn!("⚠️ Failed to fetch code of {:?}: {}", implementation, e))
            .ok()?;
        ledger
            .contract_by_deployed_code(&code)
            .map(|name| name.to_string())
    }
}

pub struct IdentityResolver {
    client: Arc<dyn ChainClient>,
    proxy: Box<dyn ProxyResolver>,
}

impl IdentityResolver {
    pub fn new(client: Arc<dyn ChainClient>) -> Self {
        Self {
            client,
            proxy: Box::new(UniqueSelectorResolver),
        }
    }

    pub fn with_proxy_resolver(mut self, proxy: Box<dyn ProxyResolver>) -> Self {
        self.proxy = proxy;
        self
    }

    pub fn proxy_resolver_name(&self) -> &'static str {
        self.proxy.name()
    }

    /// Runs the strategies in [`ResolutionStrategy::ORDER`]; `None` means unresolved.
    pub async fn resolve(
        &self,
        ledger: &GasLedger,
        to: Address,
        input: &[u8],
    ) -> Option<Resolution> {
        let call = CallTarget {
            to,
            input,
            bound: ledger.lookup_address(&to),
        };

        for strategy in ResolutionStrategy::ORDER {
            if let Some(resolution) = self.attempt(strategy, ledger, call).await {
                debug!(
                    "Resolved call to {:?} as {} via {}",
                    to,
                    resolution.contract,
                    strategy.as_str()
                );
                metrics::increment_resolution(strategy.as_str());
                return Some(resolution);
            }
        }

        debug!("Unresolved call to {:?} ({} bytes input)", to, input.len());
        None
    }

    async fn attempt(
        &self,
        strategy: ResolutionStrategy,
        ledger: &GasLedger,
        call: CallTarget<'_>,
    ) -> Option<Resolution> {
        let resolved = |contract: String, bind: Option<Address>| Resolution {
            contract,
            strategy,
            bind,
        };

        match strategy {
            ResolutionStrategy::DirectBind => {
                let name = call.bound?;
                let selector = selector_of(call.input)?;
                ledger
                    .has_method(name, &selector)
                    .then(|| resolved(name.to_string(), None))
            }
            ResolutionStrategy::Proxy => {
                call.bound?;
                self.proxy
                    .resolve(ledger, call)
                    .await
                    .map(|name| resolved(name, None))
            }
            ResolutionStrategy::DeployedBytecode => {
                if call.bound.is_some() {
                    return None;
                }
                match self.client.code_at(call.to).await {
                    Ok(code) => ledger
                        .contract_by_deployed_code(&code)
                        .map(|name| resolved(name.to_string(), Some(call.to))),
                    Err(e) => {
                        warn!(
                            "⚠️ Could not fetch code at {:?}, skipping bytecode match: {}",
                            call.to, e
                        );
                        None
                    }
                }
            }
            ResolutionStrategy::MethodSignature => {
                let selector = selector_of(call.input)?;
                ledger
                    .contracts_with_selector(&selector)
                    .first()
                    .map(|name| resolved(name.to_string(), None))
            }
        }
    }
}
