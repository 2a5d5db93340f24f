//! Builds the gateway map from configuration. Adapters are plain values in
//! a map keyed by token type; nothing outside this module knows which chain
//! is behind which adapter.

use std::sync::Arc;

use winc_common::address::TokenType;
use winc_gateway::{
    ario::ArioGateway, arweave::ArweaveGateway, evm::EvmGateway,
    kyve::KyveGateway, solana::SolanaGateway, GatewayMap,
};

use crate::config::Config;

pub fn build_gateway_map(config: &Config) -> GatewayMap {
    let client = reqwest::Client::new();
    let mut map = GatewayMap::new();

    map.insert(
        TokenType::Arweave,
        Arc::new(ArweaveGateway::new(
            client.clone(),
            config.arweave_gateway_url.clone(),
            config.arweave_min_confirmations,
        )),
    );
    map.insert(
        TokenType::Ethereum,
        Arc::new(EvmGateway::new(
            client.clone(),
            config.ethereum_rpc_url.clone(),
            config.ethereum_min_confirmations,
        )),
    );
    map.insert(
        TokenType::BaseEth,
        Arc::new(EvmGateway::new(
            client.clone(),
            config.base_eth_rpc_url.clone(),
            config.base_eth_min_confirmations,
        )),
    );
    // Matic and pol are the same chain under two token names.
    for token_type in [TokenType::Matic, TokenType::Pol] {
        map.insert(
            token_type,
            Arc::new(EvmGateway::new(
                client.clone(),
                config.matic_rpc_url.clone(),
                config.default_min_confirmations,
            )),
        );
    }
    map.insert(
        TokenType::Solana,
        Arc::new(SolanaGateway::new(
            client.clone(),
            config.solana_rpc_url.clone(),
        )),
    );
    map.insert(
        TokenType::Kyve,
        Arc::new(KyveGateway::new(
            client.clone(),
            config.kyve_rest_url.clone(),
        )),
    );
    map.insert(
        TokenType::Ario,
        Arc::new(ArioGateway::new(
            client,
            config.cu_url.clone(),
            config.ario_process_id.clone(),
        )),
    );

    map
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::Config;

    #[test]
    fn every_token_type_has_a_gateway() {
        let config = Config::from_env().unwrap();
        let map = build_gateway_map(&config);
        for token_type in TokenType::ALL {
            assert!(map.get(token_type).is_some(), "missing {token_type}");
        }
    }
}
