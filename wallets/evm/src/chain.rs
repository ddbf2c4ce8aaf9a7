//! Chain identifiers, network profiles and per-wallet chain rules

use polywallet_provider::methods;
use polywallet_traits::{BrowserLink, ChainType, WalletError};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error parsing a chain id
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid chain id: {0}")]
pub struct ChainIdError(pub String);

/// An EVM chain id, compared numerically (`0x01`, `0x1` and `1` are equal)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChainId(pub u64);

impl ChainId {
    /// Ethereum mainnet
    pub const ETHEREUM: ChainId = ChainId(1);
    /// Ropsten
    pub const ROPSTEN: ChainId = ChainId(3);
    /// Rinkeby
    pub const RINKEBY: ChainId = ChainId(4);
    /// Goerli
    pub const GOERLI: ChainId = ChainId(5);
    /// Kovan
    pub const KOVAN: ChainId = ChainId(42);
    /// BNB Smart Chain mainnet
    pub const BSC: ChainId = ChainId(56);
    /// BNB Smart Chain testnet
    pub const BSC_TESTNET: ChainId = ChainId(97);

    /// Parses `0x`-prefixed hex or plain decimal
    pub fn parse(raw: &str) -> Result<Self, ChainIdError> {
        let raw = raw.trim();
        let parsed = match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
            Some(hex) => u64::from_str_radix(hex, 16),
            None => raw.parse::<u64>(),
        };
        parsed
            .map(ChainId)
            .map_err(|_| ChainIdError(raw.to_string()))
    }

    /// The id as a JSON-RPC quantity, e.g. `0x38`
    pub fn to_hex(&self) -> String {
        format!("{:#x}", self.0)
    }

    /// The numeric id
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl FromStr for ChainId {
    type Err = ChainIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<u64> for ChainId {
    fn from(id: u64) -> Self {
        ChainId(id)
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

const ETH_CHAINS: &[ChainId] = &[
    ChainId::ETHEREUM,
    ChainId::ROPSTEN,
    ChainId::RINKEBY,
    ChainId::GOERLI,
    ChainId::KOVAN,
];

const BNB_CHAINS: &[ChainId] = &[ChainId::BSC, ChainId::BSC_TESTNET];

/// The chain family a known chain id belongs to, regardless of profile
pub fn family_of(chain_id: ChainId) -> Option<ChainType> {
    if ETH_CHAINS.contains(&chain_id) {
        Some(ChainType::Eth)
    } else if BNB_CHAINS.contains(&chain_id) {
        Some(ChainType::Bnb)
    } else {
        None
    }
}

/// Which networks the wallets are pointed at
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkProfile {
    /// Production chains
    #[default]
    Mainnet,
    /// Test chains
    Testnet,
}

/// How a wallet is asked to change chains
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchMethod {
    /// `wallet_switchEthereumChain`, or `wallet_addEthereumChain` for BNB
    /// chains the wallet may not know
    Standard,
    /// Binance Chain Wallet's `switchNetwork(networkId)`
    BinanceNetwork,
}

/// Accepted and target chains for one family
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FamilyRule {
    /// Chain ids considered already on the family
    pub accepted: Vec<ChainId>,
    /// Chain id switched to otherwise
    pub target: ChainId,
}

impl FamilyRule {
    fn new(accepted: &[ChainId], target: ChainId) -> Self {
        Self {
            accepted: accepted.to_vec(),
            target,
        }
    }
}

/// Chain negotiation rules of one wallet variant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainRules {
    /// ETH family rule
    pub eth: FamilyRule,
    /// BNB family rule
    pub bnb: FamilyRule,
    /// How switches are requested
    pub switch: SwitchMethod,
    /// Status reported when the switch request fails for a reason other
    /// than the user declining
    pub switch_error: WalletError,
}

impl ChainRules {
    /// Rules of wallets that speak the standard EIP-3085/3326 methods
    pub fn for_profile(profile: NetworkProfile) -> Self {
        match profile {
            NetworkProfile::Mainnet => Self {
                eth: FamilyRule::new(&[ChainId::ETHEREUM], ChainId::ETHEREUM),
                bnb: FamilyRule::new(&[ChainId::BSC], ChainId::BSC),
                switch: SwitchMethod::Standard,
                switch_error: WalletError::UserNotLogged,
            },
            NetworkProfile::Testnet => Self {
                eth: FamilyRule::new(
                    &[ChainId::ROPSTEN, ChainId::RINKEBY, ChainId::GOERLI, ChainId::KOVAN],
                    ChainId::ROPSTEN,
                ),
                bnb: FamilyRule::new(&[ChainId::BSC_TESTNET], ChainId::BSC_TESTNET),
                switch: SwitchMethod::Standard,
                switch_error: WalletError::UserNotLogged,
            },
        }
    }

    /// Binance Chain Wallet: only Ethereum mainnet on the ETH side, switches
    /// through `switchNetwork`, and non-rejection failures are `Fail`
    pub fn binance(profile: NetworkProfile) -> Self {
        let base = Self::for_profile(profile);
        Self {
            eth: FamilyRule::new(&[ChainId::ETHEREUM], ChainId::ETHEREUM),
            bnb: base.bnb,
            switch: SwitchMethod::BinanceNetwork,
            switch_error: WalletError::Fail,
        }
    }

    /// The rule for a family, `None` for Tron
    pub fn rule(&self, family: ChainType) -> Option<&FamilyRule> {
        match family {
            ChainType::Eth => Some(&self.eth),
            ChainType::Bnb => Some(&self.bnb),
            ChainType::Trx => None,
        }
    }

    /// Checks if `chain_id` already counts as `family`
    pub fn accepts(&self, family: ChainType, chain_id: ChainId) -> bool {
        self.rule(family)
            .is_some_and(|rule| rule.accepted.contains(&chain_id))
    }

    /// The family whose accepted set contains `chain_id`
    pub fn family_of(&self, chain_id: ChainId) -> Option<ChainType> {
        [ChainType::Eth, ChainType::Bnb]
            .into_iter()
            .find(|family| self.accepts(*family, chain_id))
    }

    /// The chain switched to for `family`
    pub fn target(&self, family: ChainType) -> Option<ChainId> {
        self.rule(family).map(|rule| rule.target)
    }

    /// The provider request that asks the wallet to move to `family`
    pub fn switch_request(&self, family: ChainType) -> Option<(&'static str, Value)> {
        let target = self.target(family)?;
        let request = match (self.switch, family) {
            (SwitchMethod::BinanceNetwork, _) => {
                (methods::BNB_SWITCH_NETWORK, json!([network_id(target)?]))
            }
            (SwitchMethod::Standard, ChainType::Bnb) => {
                (methods::WALLET_ADD_ETHEREUM_CHAIN, json!([add_chain_params(target)?]))
            }
            _ => (
                methods::WALLET_SWITCH_ETHEREUM_CHAIN,
                json!([{ "chainId": target.to_hex() }]),
            ),
        };
        Some(request)
    }
}

/// Binance Chain Wallet network id for a chain
pub fn network_id(chain_id: ChainId) -> Option<&'static str> {
    match chain_id {
        ChainId::ETHEREUM => Some("eth-mainnet"),
        ChainId::BSC => Some("bsc-mainnet"),
        ChainId::BSC_TESTNET => Some("bsc-testnet"),
        _ => None,
    }
}

/// `wallet_addEthereumChain` parameters for the BNB Smart Chain networks
pub fn add_chain_params(chain_id: ChainId) -> Option<Value> {
    let (name, rpc, explorer) = match chain_id {
        ChainId::BSC => (
            "Binance Smart Chain Mainnet",
            "https://bsc-dataseed1.binance.org",
            "https://bscscan.com",
        ),
        ChainId::BSC_TESTNET => (
            "Binance Smart Chain Testnet",
            "https://data-seed-prebsc-1-s1.binance.org:8545",
            "https://testnet.bscscan.com",
        ),
        _ => return None,
    };
    Some(json!({
        "chainId": chain_id.to_hex(),
        "chainName": name,
        "rpcUrls": [rpc],
        "blockExplorerUrls": [explorer],
        "nativeCurrency": { "name": "BNB", "symbol": "BNB", "decimals": 18 },
    }))
}

fn explorer(chain_id: ChainId) -> Option<(&'static str, &'static str)> {
    let entry = match chain_id {
        ChainId::ETHEREUM => ("Etherscan", "https://etherscan.io"),
        ChainId::ROPSTEN => ("Etherscan", "https://ropsten.etherscan.io"),
        ChainId::KOVAN => ("Etherscan", "https://kovan.etherscan.io"),
        ChainId::RINKEBY => ("Etherscan", "https://rinkeby.etherscan.io"),
        ChainId::GOERLI => ("Etherscan", "https://goerli.etherscan.io"),
        ChainId::BSC => ("BscScan", "https://bscscan.com"),
        ChainId::BSC_TESTNET => ("BscScan", "https://testnet.bscscan.com"),
        _ => return None,
    };
    Some(entry)
}

/// Explorer page of `address` on `chain_id`, empty for unknown chains
pub fn explorer_link(chain_id: ChainId, address: &str) -> BrowserLink {
    match explorer(chain_id) {
        Some((name, base)) => BrowserLink::new(name, format!("{base}/address/{address}")),
        None => BrowserLink::empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_id_parse() {
        assert_eq!(ChainId::parse("0x01").unwrap(), ChainId::ETHEREUM);
        assert_eq!(ChainId::parse("0x1").unwrap(), ChainId::ETHEREUM);
        assert_eq!(ChainId::parse("1").unwrap(), ChainId::ETHEREUM);
        assert_eq!("0x38".parse::<ChainId>().unwrap(), ChainId::BSC);
        assert_eq!(ChainId::parse("97").unwrap(), ChainId::BSC_TESTNET);
        assert!(ChainId::parse("0xzz").is_err());
        assert!(ChainId::parse("").is_err());
    }

    #[test]
    fn test_chain_id_hex() {
        assert_eq!(ChainId::BSC.to_hex(), "0x38");
        assert_eq!(ChainId::KOVAN.to_string(), "0x2a");
    }

    #[test]
    fn test_family_of() {
        assert_eq!(family_of(ChainId::RINKEBY), Some(ChainType::Eth));
        assert_eq!(family_of(ChainId::BSC_TESTNET), Some(ChainType::Bnb));
        assert_eq!(family_of(ChainId(137)), None);
    }

    #[test]
    fn test_rules_family_of() {
        let mainnet = ChainRules::for_profile(NetworkProfile::Mainnet);
        assert_eq!(mainnet.family_of(ChainId::BSC), Some(ChainType::Bnb));
        assert_eq!(mainnet.family_of(ChainId::RINKEBY), None);

        let testnet = ChainRules::for_profile(NetworkProfile::Testnet);
        assert_eq!(testnet.family_of(ChainId::KOVAN), Some(ChainType::Eth));
        assert_eq!(testnet.family_of(ChainId::ETHEREUM), None);
    }

    #[test]
    fn test_mainnet_rules() {
        let rules = ChainRules::for_profile(NetworkProfile::Mainnet);
        assert!(rules.accepts(ChainType::Eth, ChainId::ETHEREUM));
        assert!(!rules.accepts(ChainType::Eth, ChainId::RINKEBY));
        assert!(!rules.accepts(ChainType::Trx, ChainId::ETHEREUM));
        assert_eq!(rules.target(ChainType::Bnb), Some(ChainId::BSC));
        assert_eq!(rules.target(ChainType::Trx), None);
    }

    #[test]
    fn test_testnet_rules() {
        let rules = ChainRules::for_profile(NetworkProfile::Testnet);
        assert!(rules.accepts(ChainType::Eth, ChainId::KOVAN));
        assert!(!rules.accepts(ChainType::Eth, ChainId::ETHEREUM));
        assert_eq!(rules.target(ChainType::Eth), Some(ChainId::ROPSTEN));
        assert_eq!(rules.target(ChainType::Bnb), Some(ChainId::BSC_TESTNET));
    }

    #[test]
    fn test_binance_rules() {
        let rules = ChainRules::binance(NetworkProfile::Testnet);
        assert_eq!(rules.target(ChainType::Eth), Some(ChainId::ETHEREUM));
        assert_eq!(rules.switch_error, WalletError::Fail);

        let (method, params) = rules.switch_request(ChainType::Bnb).unwrap();
        assert_eq!(method, methods::BNB_SWITCH_NETWORK);
        assert_eq!(params, json!(["bsc-testnet"]));
    }

    #[test]
    fn test_standard_switch_requests() {
        let rules = ChainRules::for_profile(NetworkProfile::Mainnet);

        let (method, params) = rules.switch_request(ChainType::Eth).unwrap();
        assert_eq!(method, methods::WALLET_SWITCH_ETHEREUM_CHAIN);
        assert_eq!(params, json!([{ "chainId": "0x1" }]));

        let (method, params) = rules.switch_request(ChainType::Bnb).unwrap();
        assert_eq!(method, methods::WALLET_ADD_ETHEREUM_CHAIN);
        assert_eq!(params[0]["chainId"], "0x38");
        assert_eq!(params[0]["nativeCurrency"]["decimals"], 18);

        assert!(rules.switch_request(ChainType::Trx).is_none());
    }

    #[test]
    fn test_explorer_links() {
        let link = explorer_link(ChainId::GOERLI, "0xabc");
        assert_eq!(link.name, "Etherscan");
        assert_eq!(link.url, "https://goerli.etherscan.io/address/0xabc");

        let link = explorer_link(ChainId::BSC, "0xabc");
        assert_eq!(link.url, "https://bscscan.com/address/0xabc");

        assert!(explorer_link(ChainId(137), "0xabc").is_empty());
    }

    #[test]
    fn test_profile_serde() {
        assert_eq!(serde_json::to_string(&NetworkProfile::Testnet).unwrap(), "\"testnet\"");
        let profile: NetworkProfile = serde_json::from_str("\"mainnet\"").unwrap();
        assert_eq!(profile, NetworkProfile::Mainnet);
    }
}
