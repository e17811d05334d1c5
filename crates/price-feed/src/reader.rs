//! On-chain feed readers
//!
//! A [`FeedReader`] returns the raw `(mantissa, rawTimestamp, scale)`
//! tuple of one feed. [`ChainReader`] reads every feed shape in the
//! catalog through a single explicitly constructed JSON-RPC provider.

use alloy::primitives::{Address, Sign, I256, U256};
use alloy::providers::{ProviderBuilder, ReqwestProvider};
use alloy::sol;
use alloy::transports::http::reqwest::Url;
use async_trait::async_trait;
use std::future::IntoFuture;
use std::time::Duration;
use tracing::{debug, info};

use oracle_core::{
    decimals_from_u256, FeedError, FeedResult, FeedSource, FeedSpec, RawFeedTuple, RpcConfig,
    Scale, WAD_DECIMALS,
};

sol! {
    #[sol(rpc)]
    interface IAggregatorV3 {
        function latestRoundData() external view returns (uint80 roundId, int256 answer, uint256 startedAt, uint256 updatedAt, uint80 answeredInRound);
        function decimals() external view returns (uint8);
    }

    #[sol(rpc)]
    interface IPyth {
        struct Price {
            int64 price;
            uint64 conf;
            int32 expo;
            uint256 publishTime;
        }

        function getPrice(bytes32 id) external view returns (Price memory price);
    }

    #[sol(rpc)]
    interface IChronicle {
        function readWithAge() external view returns (uint256 value, uint256 age);
    }

    #[sol(rpc)]
    interface IOrocle {
        function getLatestRound(uint32 appId, bytes20 identifier) external view returns (uint64 round, uint256 lastUpdate, uint256 data);
    }

    #[sol(rpc)]
    interface IStork {
        struct TemporalNumericValue {
            uint256 timestampNs;
            int192 quantizedValue;
        }

        function getTemporalNumericValueV1(bytes32 id) external view returns (TemporalNumericValue memory value);
    }

    #[sol(rpc)]
    interface ISupra {
        struct PriceFeed {
            uint256 round;
            uint256 decimals;
            uint256 time;
            uint256 price;
        }

        function getSvalue(uint256 _pairIndex) external view returns (PriceFeed memory feed);
    }
}

/// Source of raw feed tuples
#[async_trait]
pub trait FeedReader: Send + Sync {
    async fn read(&self, spec: &FeedSpec) -> FeedResult<RawFeedTuple>;
}

/// Reads feeds through contract calls on one RPC endpoint
#[derive(Clone)]
pub struct ChainReader {
    provider: ReqwestProvider,
    timeout: Duration,
}

impl ChainReader {
    pub fn connect(config: &RpcConfig) -> FeedResult<Self> {
        let url = Url::parse(&config.http_url)
            .map_err(|e| FeedError::unavailable("rpc", format!("{}: {}", config.http_url, e)))?;

        info!("Using RPC endpoint {} (chain {})", config.http_url, config.chain_id);

        Ok(Self {
            provider: ProviderBuilder::new().on_http(url),
            timeout: config.timeout(),
        })
    }

    async fn read_source(&self, name: &str, source: &FeedSource) -> FeedResult<RawFeedTuple> {
        let unavailable = |e: alloy::contract::Error| FeedError::unavailable(name, e);

        match *source {
            FeedSource::Aggregator { address } => {
                let feed = IAggregatorV3::new(address, &self.provider);
                let round_call = feed.latestRoundData();
                let decimals_call = feed.decimals();
                let (round, decimals) = futures::try_join!(
                    round_call.call().into_future(),
                    decimals_call.call().into_future()
                )
                .map_err(unavailable)?;

                Ok(RawFeedTuple::new(
                    round.answer,
                    round.updatedAt,
                    Scale::Decimals(decimals._0),
                ))
            }
            FeedSource::Pyth { contract, feed_id } => {
                let price = IPyth::new(contract, &self.provider)
                    .getPrice(feed_id)
                    .call()
                    .await
                    .map_err(unavailable)?
                    .price;

                let mantissa = I256::try_from(price.price).map_err(|e| FeedError::unavailable(name, e))?;
                Ok(RawFeedTuple::new(mantissa, price.publishTime, Scale::Exponent(price.expo)))
            }
            FeedSource::Chronicle { address } => {
                let reading = IChronicle::new(address, &self.provider)
                    .readWithAge()
                    .call()
                    .await
                    .map_err(unavailable)?;

                Ok(RawFeedTuple::new(
                    unsigned_mantissa(name, reading.value)?,
                    reading.age,
                    Scale::Decimals(WAD_DECIMALS),
                ))
            }
            FeedSource::Orocle {
                contract,
                app_id,
                identifier,
            } => {
                let round = IOrocle::new(contract, &self.provider)
                    .getLatestRound(app_id, identifier)
                    .call()
                    .await
                    .map_err(unavailable)?;

                Ok(RawFeedTuple::new(
                    unsigned_mantissa(name, round.data)?,
                    round.lastUpdate,
                    Scale::Decimals(WAD_DECIMALS),
                ))
            }
            FeedSource::Stork { contract, asset_id } => {
                let value = IStork::new(contract, &self.provider)
                    .getTemporalNumericValueV1(asset_id)
                    .call()
                    .await
                    .map_err(unavailable)?
                    .value;

                let mantissa = I256::from_dec_str(&value.quantizedValue.to_string())
                    .map_err(|e| FeedError::unavailable(name, e))?;
                Ok(RawFeedTuple::new(mantissa, value.timestampNs, Scale::Decimals(WAD_DECIMALS)))
            }
            FeedSource::Supra { contract, pair_id } => {
                let feed = ISupra::new(contract, &self.provider)
                    .getSvalue(U256::from(pair_id))
                    .call()
                    .await
                    .map_err(unavailable)?
                    .feed;

                let decimals = decimals_from_u256(feed.decimals).ok_or_else(|| {
                    FeedError::unavailable(name, format!("decimals {} out of range", feed.decimals))
                })?;
                Ok(RawFeedTuple::new(
                    unsigned_mantissa(name, feed.price)?,
                    feed.time,
                    Scale::Decimals(decimals),
                ))
            }
            FeedSource::Unsupported => Err(FeedError::unavailable(name, "no feed for this asset")),
        }
    }
}

fn unsigned_mantissa(name: &str, value: U256) -> FeedResult<I256> {
    I256::checked_from_sign_and_abs(Sign::Positive, value)
        .ok_or_else(|| FeedError::unavailable(name, format!("mantissa {value} exceeds int256")))
}

#[async_trait]
impl FeedReader for ChainReader {
    async fn read(&self, spec: &FeedSpec) -> FeedResult<RawFeedTuple> {
        let name = spec.name();
        debug!(oracle = %name, "reading feed");

        match tokio::time::timeout(self.timeout, self.read_source(&name, &spec.source)).await {
            Ok(result) => result,
            Err(_) => Err(FeedError::Timeout {
                feed: name,
                after_ms: self.timeout.as_millis() as u64,
            }),
        }
    }
}

/// Address a feed is read from, for logging
pub fn source_address(source: &FeedSource) -> Option<Address> {
    match *source {
        FeedSource::Aggregator { address } | FeedSource::Chronicle { address } => Some(address),
        FeedSource::Pyth { contract, .. }
        | FeedSource::Orocle { contract, .. }
        | FeedSource::Stork { contract, .. }
        | FeedSource::Supra { contract, .. } => Some(contract),
        FeedSource::Unsupported => None,
    }
}
