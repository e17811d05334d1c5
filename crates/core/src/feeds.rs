//! Feed catalog for the oracle networks deployed on Monad mainnet

use alloy_primitives::{address, b256, fixed_bytes, Address, FixedBytes, B256, I256, U256};
use serde::{Deserialize, Serialize};

use crate::{Asset, OracleProvider};

pub const CHAINLINK_BTC_USD: Address = address!("c1d4C3331635184fA4C3c22fb92211B2Ac9E0546");
pub const CHAINLINK_MON_USD: Address = address!("BcD78f76005B7515837af6b50c7C52BCf73822fb");
pub const PYTH_CONTRACT: Address = address!("2880aB155794e7179c9eE2e38200202908C17B43");
pub const PYTH_BTC_USD_FEED_ID: B256 =
    b256!("e62df6c8b4a85fe1a67db44dc12de5db330f7ac66b72dc658afedf0f4a415b43");
pub const PYTH_MON_USD_FEED_ID: B256 =
    b256!("31491744e2dbf6df7fcf4ac0820d18a609b49076d45066d3568424e62f686cd1");
pub const CHRONICLE_BTC_USD: Address = address!("ECd09Ce60c069384D6B91656A841097F1181A59e");
pub const CHRONICLE_MON_USD: Address = address!("936a444C983347FFBfe3F26D1497CAbfA2BfE271");
pub const EORACLE_BTC_USD: Address = address!("EB0CDef56e02A334B7eaB620560aDa727bB994f6");
pub const OROCLE_CONTRACT: Address = address!("78291455bf33aA5437f9D69Ff63E0B1C09833429");
/// "BTC" as bytes20
pub const OROCLE_BTC_IDENTIFIER: FixedBytes<20> =
    fixed_bytes!("4254430000000000000000000000000000000000");
/// "MON" as bytes20
pub const OROCLE_MON_IDENTIFIER: FixedBytes<20> =
    fixed_bytes!("4D4F4E0000000000000000000000000000000000");
/// Orocle application id for asset prices
pub const OROCLE_ASSET_APP_ID: u32 = 1;
pub const REDSTONE_BTC_USD: Address = address!("ED2B1ca5D7E246f615c2291De309643D41FeC97e");
pub const REDSTONE_MON_USD: Address = address!("1C9582E87eD6E99bc23EC0e6Eb52eE9d7C0D6bcd");
pub const STORK_CONTRACT: Address = address!("acC0a0cF13571d30B4b8637996F5D6D774d4fd62");
pub const STORK_BTC_USD_ID: B256 =
    b256!("7404e3d104ea7841c3d9e6fd20adfe99b4ad586bc08d8f3bd3afef894cf184de");
pub const STORK_MON_USD_ID: B256 =
    b256!("a4f6b07ae0c89e3f3cc03c1badcc3e9adffdf7206bafcd56d142979800887385");
pub const SUPRA_CONTRACT: Address = address!("58e158c74DF7Ad6396C0dcbadc4878faC9e93d57");
pub const SUPRA_BTC_USD_PAIR_ID: u64 = 18;
/// Supra has no MON/USD pair; MON/USDT is used instead
pub const SUPRA_MON_USDT_PAIR_ID: u64 = 569;

/// Chronicle, Orocle and Stork publish 18-decimal fixed point values
pub const WAD_DECIMALS: u8 = 18;

/// Unit of a feed's self-reported timestamp
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimestampUnit {
    Seconds,
    Milliseconds,
    Nanoseconds,
}

impl TimestampUnit {
    pub fn per_second(&self) -> u64 {
        match self {
            TimestampUnit::Seconds => 1,
            TimestampUnit::Milliseconds => 1_000,
            TimestampUnit::Nanoseconds => 1_000_000_000,
        }
    }
}

/// How a mantissa scales to a display price
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Scale {
    /// `price = mantissa / 10^decimals`
    Decimals(u8),
    /// `price = mantissa * 10^exponent`
    Exponent(i32),
}

/// Raw `(mantissa, rawTimestamp, scaleInfo)` as returned by a feed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawFeedTuple {
    pub mantissa: I256,
    pub raw_timestamp: U256,
    pub scale: Scale,
}

impl RawFeedTuple {
    pub fn new(mantissa: I256, raw_timestamp: U256, scale: Scale) -> Self {
        Self {
            mantissa,
            raw_timestamp,
            scale,
        }
    }
}

/// Where and how a feed is read on chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedSource {
    /// AggregatorV3 compatible (`latestRoundData` + `decimals`)
    Aggregator { address: Address },
    Pyth { contract: Address, feed_id: B256 },
    /// `readWithAge`
    Chronicle { address: Address },
    Orocle {
        contract: Address,
        app_id: u32,
        identifier: FixedBytes<20>,
    },
    Stork { contract: Address, asset_id: B256 },
    Supra { contract: Address, pair_id: u64 },
    /// The provider publishes nothing for this asset
    Unsupported,
}

impl FeedSource {
    pub fn timestamp_unit(&self) -> TimestampUnit {
        match self {
            FeedSource::Stork { .. } => TimestampUnit::Nanoseconds,
            FeedSource::Supra { .. } => TimestampUnit::Milliseconds,
            _ => TimestampUnit::Seconds,
        }
    }
}

/// One configured oracle feed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedSpec {
    pub provider: OracleProvider,
    pub asset: Asset,
    pub source: FeedSource,
}

impl FeedSpec {
    pub fn new(provider: OracleProvider, asset: Asset, source: FeedSource) -> Self {
        Self {
            provider,
            asset,
            source,
        }
    }

    pub fn name(&self) -> String {
        self.provider.oracle_name(self.asset)
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self.source, FeedSource::Unsupported)
    }
}

/// Feeds for an asset, in display (fetch) order
pub fn feeds_for(asset: Asset) -> Vec<FeedSpec> {
    match asset {
        Asset::Btc => btc_feeds(),
        Asset::Mon => mon_feeds(),
    }
}

pub fn btc_feeds() -> Vec<FeedSpec> {
    let asset = Asset::Btc;
    vec![
        FeedSpec::new(
            OracleProvider::Chainlink,
            asset,
            FeedSource::Aggregator { address: CHAINLINK_BTC_USD },
        ),
        FeedSpec::new(
            OracleProvider::Pyth,
            asset,
            FeedSource::Pyth {
                contract: PYTH_CONTRACT,
                feed_id: PYTH_BTC_USD_FEED_ID,
            },
        ),
        FeedSpec::new(
            OracleProvider::Chronicle,
            asset,
            FeedSource::Chronicle { address: CHRONICLE_BTC_USD },
        ),
        // eOracle is AggregatorV3 compatible
        FeedSpec::new(
            OracleProvider::EOracle,
            asset,
            FeedSource::Aggregator { address: EORACLE_BTC_USD },
        ),
        FeedSpec::new(
            OracleProvider::Orocle,
            asset,
            FeedSource::Orocle {
                contract: OROCLE_CONTRACT,
                app_id: OROCLE_ASSET_APP_ID,
                identifier: OROCLE_BTC_IDENTIFIER,
            },
        ),
        FeedSpec::new(
            OracleProvider::RedStone,
            asset,
            FeedSource::Aggregator { address: REDSTONE_BTC_USD },
        ),
        FeedSpec::new(
            OracleProvider::Stork,
            asset,
            FeedSource::Stork {
                contract: STORK_CONTRACT,
                asset_id: STORK_BTC_USD_ID,
            },
        ),
        FeedSpec::new(
            OracleProvider::Supra,
            asset,
            FeedSource::Supra {
                contract: SUPRA_CONTRACT,
                pair_id: SUPRA_BTC_USD_PAIR_ID,
            },
        ),
    ]
}

pub fn mon_feeds() -> Vec<FeedSpec> {
    let asset = Asset::Mon;
    vec![
        FeedSpec::new(
            OracleProvider::Chainlink,
            asset,
            FeedSource::Aggregator { address: CHAINLINK_MON_USD },
        ),
        FeedSpec::new(
            OracleProvider::Pyth,
            asset,
            FeedSource::Pyth {
                contract: PYTH_CONTRACT,
                feed_id: PYTH_MON_USD_FEED_ID,
            },
        ),
        FeedSpec::new(
            OracleProvider::Chronicle,
            asset,
            FeedSource::Chronicle { address: CHRONICLE_MON_USD },
        ),
        FeedSpec::new(
            OracleProvider::Orocle,
            asset,
            FeedSource::Orocle {
                contract: OROCLE_CONTRACT,
                app_id: OROCLE_ASSET_APP_ID,
                identifier: OROCLE_MON_IDENTIFIER,
            },
        ),
        FeedSpec::new(
            OracleProvider::RedStone,
            asset,
            FeedSource::Aggregator { address: REDSTONE_MON_USD },
        ),
        FeedSpec::new(
            OracleProvider::Stork,
            asset,
            FeedSource::Stork {
                contract: STORK_CONTRACT,
                asset_id: STORK_MON_USD_ID,
            },
        ),
        FeedSpec::new(
            OracleProvider::Supra,
            asset,
            FeedSource::Supra {
                contract: SUPRA_CONTRACT,
                pair_id: SUPRA_MON_USDT_PAIR_ID,
            },
        ),
        FeedSpec::new(OracleProvider::EOracle, asset, FeedSource::Unsupported),
    ]
}
