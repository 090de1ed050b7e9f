use alloy::primitives::{
    Address,
    U256,
    address,
};

pub mod pizza_party_types {
    use alloy::sol;

    sol! {
        #[sol(rpc)]
        #[derive(Debug, PartialEq, Eq)]
        interface IPizzaParty {
            struct DailyGame {
                uint256 gameId;
                uint256 startTime;
                uint256 endTime;
                uint256 totalEntries;
                uint256 jackpotAmount;
                address[] winners;
                bool isCompleted;
            }

            struct PlayerInfo {
                uint256 totalToppings;
                uint256 dailyEntries;
                uint256 lastEntryTime;
            }

            struct ReferralInfo {
                string referralCode;
                address referrer;
                uint256 totalReferrals;
                uint256 lifetimeReferrals;
                bool isActive;
            }

            event DailyGameEntered(
                uint256 indexed gameId,
                address indexed player,
                uint256 toppings,
                uint256 amountPaid
            );

            event ReferralCodeCreated(address indexed player, string referralCode);

            function enterDailyGame(string referralCode) external;
            function createReferralCode() external;

            function getEntryFee() external view returns (uint256);
            function getCurrentVMFPrice() external view returns (uint256);
            function currentDailyJackpot() external view returns (uint256);
            function getCurrentDailyGame() external view returns (DailyGame memory);
            function getPlayerInfo(address player) external view returns (PlayerInfo memory);
            function getReferralInfo(address player) external view returns (ReferralInfo memory);
            function hasEnteredToday(address player) external view returns (bool);
        }
    }
}

pub mod vmf_types {
    use alloy::sol;

    sol! {
        #[sol(rpc)]
        interface IVmfToken {
            function approve(address spender, uint256 amount) external returns (bool);
            function allowance(address owner, address spender) external view returns (uint256);
            function balanceOf(address account) external view returns (uint256);
        }
    }
}

pub const BASE_CHAIN_ID: u64 = 8453;
pub const BASE_SEPOLIA_CHAIN_ID: u64 = 84532;
pub const LOCAL_CHAIN_ID: u64 = 31337;

/// Game contract on Base mainnet.
pub const PIZZA_PARTY_ADDRESS: Address =
    address!("0xaa5d96a3a462dc0ec0bc2cbd3a3ab94cd46cb57f");
/// VMF token on Base mainnet.
pub const VMF_TOKEN_ADDRESS: Address =
    address!("0x2213414893259b0c48066acd1763e7fba97859e5");

pub const WEI_PER_TOKEN: U256 = U256::from_limbs([1_000_000_000_000_000_000, 0, 0, 0]);

/// Referrals a single code may credit per week.
pub const MAX_INVITES_PER_WEEK: u64 = 3;

/// 100,000,000 VMF, granted once so daily entries don't need a fresh approval.
pub const APPROVAL_AMOUNT: U256 = U256::from_limbs([0xdcc8_0cd2_e400_0000, 5_421_010, 0, 0]);

/// Entry fee assumed until the contract reports one: 111.11 VMF, about $1 at $0.009.
pub const DEFAULT_ENTRY_FEE: U256 = U256::from_limbs([0x05f6_0450_61a7_0000, 6, 0, 0]);
pub const DEFAULT_USD_PER_TOKEN: f64 = 0.009;
