use ethers::types::Address;

/// Immutable token metadata for one Uniswap V3 pool, read once at startup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PoolTokens {
    pub pool: Address,
    pub token0: Address,
    pub token1: Address,
    /// Token0 decimals (e.g., WETH 18)
    pub token0_decimals: u8,
    /// Token1 decimals (e.g., USDT 6)
    pub token1_decimals: u8,
    /// Fee tier in hundredths of a bip (3000 = 0.3%).
    pub fee: u32,
    /// The asset prices are quoted per; must be token0 or token1.
    pub base: Address,
}

impl PoolTokens {
    /// Address comparison is on raw bytes, so hex casing never matters.
    pub fn token0_is_base(&self) -> bool {
        self.token0 == self.base
    }

    pub fn quote(&self) -> Address {
        if self.token0_is_base() {
            self.token1
        } else {
            self.token0
        }
    }

    pub fn base_decimals(&self) -> u8 {
        if self.token0_is_base() {
            self.token0_decimals
        } else {
            self.token1_decimals
        }
    }

    pub fn quote_decimals(&self) -> u8 {
        if self.token0_is_base() {
            self.token1_decimals
        } else {
            self.token0_decimals
        }
    }

    /// Uniswap's `zeroForOne` flag for a swap spending `token_in`.
    pub fn zero_for_one(&self, token_in: Address) -> bool {
        token_in == self.token0
    }
}
