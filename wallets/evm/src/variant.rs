//! What distinguishes the four EVM wallets
//!
//! Detection lives in [`crate::detector`]; everything else a wallet does
//! differently is data on [`Variant`].

use polywallet_traits::{ChainType, WalletInfo};

use crate::chain::{ChainRules, NetworkProfile};

/// Order of the connect steps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectOrder {
    /// Negotiate the chain, then request accounts
    NegotiateFirst,
    /// Request accounts, then negotiate the chain
    AccountsFirst,
    /// The chain is fixed when the session opens; request accounts and
    /// verify the session's family
    SessionBound,
}

/// How the wallet exposes accounts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountAccess {
    /// `eth_requestAccounts`, first entry
    Ethereum,
    /// `bnb_requestAddresses`, first `0x` entry
    Binance,
}

/// How personal messages are signed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignMethod {
    /// `personal_sign`
    Personal,
    /// `bnb_sign`, reading the `signature` field
    Binance,
}

/// What the adapter does with provider change events while enabled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeWatch {
    /// Nothing
    Ignore,
    /// Remember the new currency or forget the wallet, then ask the host to reload
    Reload,
    /// Forward chain changes as host events, reload on account changes
    HostEvents,
}

/// Behaviour of one EVM wallet
#[derive(Debug, Clone)]
pub struct Variant {
    /// Identity
    pub info: WalletInfo,
    /// Chain negotiation rules
    pub rules: ChainRules,
    /// Connect step order
    pub order: ConnectOrder,
    /// Account access method
    pub accounts: AccountAccess,
    /// Signing method
    pub sign: SignMethod,
    /// Change event handling
    pub watch: ChangeWatch,
    /// Disconnect the provider on logout
    pub disconnect_on_logout: bool,
    /// Narrow the supported currencies to the connected family
    pub narrow_currencies: bool,
}

impl Variant {
    /// MetaMask
    pub fn metamask(profile: NetworkProfile) -> Self {
        Self {
            info: WalletInfo::new("MetaMask", Some("https://metamask.io/"), &[ChainType::Eth, ChainType::Bnb]),
            rules: ChainRules::for_profile(profile),
            order: ConnectOrder::NegotiateFirst,
            accounts: AccountAccess::Ethereum,
            sign: SignMethod::Personal,
            watch: ChangeWatch::Reload,
            disconnect_on_logout: false,
            narrow_currencies: false,
        }
    }

    /// Coinbase Wallet, ETH only
    pub fn coinbase(profile: NetworkProfile) -> Self {
        Self {
            info: WalletInfo::new("CoinBase", Some("https://wallet.coinbase.com/"), &[ChainType::Eth]),
            rules: ChainRules::for_profile(profile),
            order: ConnectOrder::AccountsFirst,
            accounts: AccountAccess::Ethereum,
            sign: SignMethod::Personal,
            watch: ChangeWatch::Ignore,
            disconnect_on_logout: false,
            narrow_currencies: false,
        }
    }

    /// Binance Chain Wallet
    pub fn binance_chain(profile: NetworkProfile) -> Self {
        Self {
            info: WalletInfo::new(
                "Binance Chain Wallet",
                Some("https://metamask.io/"),
                &[ChainType::Eth, ChainType::Bnb],
            ),
            rules: ChainRules::binance(profile),
            order: ConnectOrder::NegotiateFirst,
            accounts: AccountAccess::Binance,
            sign: SignMethod::Binance,
            watch: ChangeWatch::HostEvents,
            disconnect_on_logout: false,
            narrow_currencies: false,
        }
    }

    /// WalletConnect
    pub fn wallet_connect(profile: NetworkProfile) -> Self {
        Self {
            info: WalletInfo::new("WalletConnect", None, &[ChainType::Eth, ChainType::Bnb]),
            rules: ChainRules::for_profile(profile),
            order: ConnectOrder::SessionBound,
            accounts: AccountAccess::Ethereum,
            sign: SignMethod::Personal,
            watch: ChangeWatch::Ignore,
            disconnect_on_logout: true,
            narrow_currencies: true,
        }
    }
}
