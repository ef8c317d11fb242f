//! Stellarcade Sunk Cost Contract
//!
//! An escalating buy-in jackpot: the last bidder standing when the clock runs
//! out takes the pot.
//!
//! ## Game Flow
//! 1. Creator calls `create_game` paying exactly `initial_buy_in` of the
//!    game's token. The creator is the first winner.
//! 2. Anyone calls `buy_in` paying exactly `current_buy_in`. The bidder
//!    becomes the winner, the deadline moves out by `extension` (never past
//!    `max_expiration`) and the next buy-in rises by `buy_in_increment`.
//! 3. Once the ledger timestamp reaches `expiration`, anyone calls `claim`
//!    and the pot is transferred to the winner. A game pays out once.
//!
//! ## Burn
//! `burn_amount` of every payment is burned on the token contract as soon as
//! it is received. Only the remainder enters the pot.
//!
//! ## Invariant
//! For every token, `token.balance(contract_address)` equals the sum of
//! `current_pot` over unclaimed games in that token, assuming all inflows go
//! through `create_game` and `buy_in`.
//!
//! ## Storage Strategy
//! - `instance()`: `NumGames`, the game counter and next id.
//! - `persistent()`: one `Game(id)` entry per game. Entries are never removed,
//!   claimed games stay readable as history.
#![no_std]
#![allow(unexpected_cfgs)]

use soroban_sdk::{
    contract, contracterror, contractevent, contractimpl, contracttype, log, token::TokenClient,
    Address, Env,
};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Persistent storage TTL in ledgers (~30 days at 5 s/ledger).
pub const PERSISTENT_BUMP_LEDGERS: u32 = 518_400;
/// Instance storage TTL in ledgers, bumped on every state-changing call.
pub const INSTANCE_BUMP_LEDGERS: u32 = 518_400;

// ---------------------------------------------------------------------------
// Error Types
// ---------------------------------------------------------------------------

#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum Error {
    GameNotFound    = 1,
    InvalidPayment  = 2,
    InvalidSchedule = 3,
    GameExpired     = 4,
    GameNotExpired  = 5,
    AlreadyClaimed  = 6,
    InvalidAmount   = 7,
    Overflow        = 8,
}

// ---------------------------------------------------------------------------
// Storage Types
// ---------------------------------------------------------------------------

#[contracttype]
#[derive(Clone)]
pub enum DataKey {
    // --- instance() ---
    NumGames,
    // --- persistent() ---
    Game(u64),
}

/// Creation parameters for a game.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct GameParams {
    /// SEP-41 token every payment into the game must be made in.
    pub token: Address,
    pub expiration: u64,
    pub max_expiration: u64,
    pub initial_buy_in: i128,
    pub buy_in_increment: i128,
    pub burn_amount: i128,
    pub extension: u64,
}

/// Tokens the caller attaches to a call. The amount is pulled from the caller
/// only after it has been checked against what the game requires.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Payment {
    pub token: Address,
    pub amount: i128,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct GameData {
    pub creator: Address,
    pub token: Address,
    /// No bids are accepted at or after this timestamp.
    pub expiration: u64,
    pub max_expiration: u64,
    pub initial_buy_in: i128,
    /// Exact amount the next bid must pay.
    pub current_buy_in: i128,
    /// Amount payable to `current_winner`, net of burns.
    pub current_pot: i128,
    pub buy_in_increment: i128,
    pub burn_amount: i128,
    pub extension: u64,
    pub current_winner: Address,
    pub claimed: bool,
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

#[contractevent]
pub struct GameCreated {
    #[topic]
    pub game_id: u64,
    pub creator: Address,
}

// ---------------------------------------------------------------------------
// Contract
// ---------------------------------------------------------------------------

#[contract]
pub struct SunkCost;

#[contractimpl]
impl SunkCost {
    // -----------------------------------------------------------------------
    // create_game
    // -----------------------------------------------------------------------

    /// Open a new game and return its id.
    ///
    /// `payment` must be exactly `params.initial_buy_in` of `params.token`.
    /// `params.expiration` must lie strictly in the future and must not exceed
    /// `params.max_expiration`.
    pub fn create_game(
        env: Env,
        creator: Address,
        params: GameParams,
        payment: Payment,
    ) -> Result<u64, Error> {
        creator.require_auth();

        if params.initial_buy_in <= 0
            || params.buy_in_increment <= 0
            || params.burn_amount < 0
            || params.burn_amount > params.initial_buy_in
        {
            return Err(Error::InvalidAmount);
        }

        if payment.token != params.token || payment.amount != params.initial_buy_in {
            return Err(Error::InvalidPayment);
        }

        let now = env.ledger().timestamp();
        if params.expiration <= now || params.max_expiration < params.expiration {
            return Err(Error::InvalidSchedule);
        }

        let current_buy_in = params
            .initial_buy_in
            .checked_add(params.buy_in_increment)
            .ok_or(Error::Overflow)?;
        let current_pot = params
            .initial_buy_in
            .checked_sub(params.burn_amount)
            .ok_or(Error::Overflow)?;

        let game_id = num_games(&env);
        let next_id = game_id.checked_add(1).ok_or(Error::Overflow)?;

        collect(&env, &creator, &payment, params.burn_amount);

        let game = GameData {
            creator: creator.clone(),
            token: params.token,
            expiration: params.expiration,
            max_expiration: params.max_expiration,
            initial_buy_in: params.initial_buy_in,
            current_buy_in,
            current_pot,
            buy_in_increment: params.buy_in_increment,
            burn_amount: params.burn_amount,
            extension: params.extension,
            current_winner: creator.clone(),
            claimed: false,
        };
        save_game(&env, game_id, &game);

        env.storage().instance().set(&DataKey::NumGames, &next_id);
        extend_instance_ttl(&env);

        log!(&env, "game created", game_id, current_pot);
        GameCreated { game_id, creator }.publish(&env);

        Ok(game_id)
    }

    // -----------------------------------------------------------------------
    // buy_in
    // -----------------------------------------------------------------------

    /// Outbid the current winner of `game_id`.
    ///
    /// `payment` must be exactly the game's `current_buy_in` in its token, and
    /// the game must not have expired yet.
    pub fn buy_in(env: Env, game_id: u64, bidder: Address, payment: Payment) -> Result<(), Error> {
        bidder.require_auth();

        let mut game = load_game(&env, game_id)?;

        let now = env.ledger().timestamp();
        if now >= game.expiration {
            return Err(Error::GameExpired);
        }

        if payment.token != game.token || payment.amount != game.current_buy_in {
            return Err(Error::InvalidPayment);
        }

        let net = payment
            .amount
            .checked_sub(game.burn_amount)
            .ok_or(Error::Overflow)?;
        game.current_pot = game.current_pot.checked_add(net).ok_or(Error::Overflow)?;
        game.current_buy_in = game
            .current_buy_in
            .checked_add(game.buy_in_increment)
            .ok_or(Error::Overflow)?;
        game.current_winner = bidder.clone();
        game.expiration = extended_expiration(&game, now);

        collect(&env, &bidder, &payment, game.burn_amount);

        save_game(&env, game_id, &game);
        extend_instance_ttl(&env);

        log!(
            &env,
            "buy-in accepted",
            game_id,
            game.current_pot,
            game.expiration
        );

        Ok(())
    }

    // -----------------------------------------------------------------------
    // claim
    // -----------------------------------------------------------------------

    /// Pay the pot of an expired game to its winner and return the amount.
    ///
    /// Anyone can call this; the funds can only go to `current_winner`.
    /// The claimed flag is persisted before the token transfer.
    pub fn claim(env: Env, game_id: u64) -> Result<i128, Error> {
        let mut game = load_game(&env, game_id)?;

        if env.ledger().timestamp() < game.expiration {
            return Err(Error::GameNotExpired);
        }
        if game.claimed {
            return Err(Error::AlreadyClaimed);
        }

        game.claimed = true;
        save_game(&env, game_id, &game);
        extend_instance_ttl(&env);

        let pot = game.current_pot;
        if pot > 0 {
            TokenClient::new(&env, &game.token).transfer(
                &env.current_contract_address(),
                &game.current_winner,
                &pot,
            );
        }

        log!(&env, "pot claimed", game_id, game.current_winner, pot);

        Ok(pot)
    }

    // -----------------------------------------------------------------------
    // Existence probe
    // -----------------------------------------------------------------------

    /// Whether `game_id` has been allocated. Never fails.
    pub fn exists(env: Env, game_id: u64) -> bool {
        game_id < num_games(&env)
    }

    /// Number of games created so far; also the id the next game will get.
    pub fn num_games(env: Env) -> u64 {
        num_games(&env)
    }

    // -----------------------------------------------------------------------
    // Attribute accessors
    // -----------------------------------------------------------------------

    /// Full snapshot of a game.
    pub fn get_game(env: Env, game_id: u64) -> Result<GameData, Error> {
        load_game(&env, game_id)
    }

    pub fn creator(env: Env, game_id: u64) -> Result<Address, Error> {
        Ok(load_game(&env, game_id)?.creator)
    }

    pub fn token_id(env: Env, game_id: u64) -> Result<Address, Error> {
        Ok(load_game(&env, game_id)?.token)
    }

    pub fn expiration(env: Env, game_id: u64) -> Result<u64, Error> {
        Ok(load_game(&env, game_id)?.expiration)
    }

    pub fn max_expiration(env: Env, game_id: u64) -> Result<u64, Error> {
        Ok(load_game(&env, game_id)?.max_expiration)
    }

    /// True once the ledger timestamp has reached the game's expiration.
    pub fn expired(env: Env, game_id: u64) -> Result<bool, Error> {
        let game = load_game(&env, game_id)?;
        Ok(env.ledger().timestamp() >= game.expiration)
    }

    pub fn initial_buy_in(env: Env, game_id: u64) -> Result<i128, Error> {
        Ok(load_game(&env, game_id)?.initial_buy_in)
    }

    pub fn current_buy_in(env: Env, game_id: u64) -> Result<i128, Error> {
        Ok(load_game(&env, game_id)?.current_buy_in)
    }

    pub fn current_pot(env: Env, game_id: u64) -> Result<i128, Error> {
        Ok(load_game(&env, game_id)?.current_pot)
    }

    pub fn buy_in_increment(env: Env, game_id: u64) -> Result<i128, Error> {
        Ok(load_game(&env, game_id)?.buy_in_increment)
    }

    pub fn burn_amount(env: Env, game_id: u64) -> Result<i128, Error> {
        Ok(load_game(&env, game_id)?.burn_amount)
    }

    pub fn extension(env: Env, game_id: u64) -> Result<u64, Error> {
        Ok(load_game(&env, game_id)?.extension)
    }

    pub fn current_winner(env: Env, game_id: u64) -> Result<Address, Error> {
        Ok(load_game(&env, game_id)?.current_winner)
    }

    pub fn claimed(env: Env, game_id: u64) -> Result<bool, Error> {
        Ok(load_game(&env, game_id)?.claimed)
    }
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn num_games(env: &Env) -> u64 {
    env.storage()
        .instance()
        .get(&DataKey::NumGames)
        .unwrap_or(0)
}

/// Ids are dense, so anything at or past the counter was never allocated.
fn load_game(env: &Env, game_id: u64) -> Result<GameData, Error> {
    if game_id >= num_games(env) {
        return Err(Error::GameNotFound);
    }
    env.storage()
        .persistent()
        .get(&DataKey::Game(game_id))
        .ok_or(Error::GameNotFound)
}

fn save_game(env: &Env, game_id: u64, game: &GameData) {
    let key = DataKey::Game(game_id);
    env.storage().persistent().set(&key, game);
    env.storage()
        .persistent()
        .extend_ttl(&key, PERSISTENT_BUMP_LEDGERS, PERSISTENT_BUMP_LEDGERS);
}

fn extend_instance_ttl(env: &Env) {
    env.storage()
        .instance()
        .extend_ttl(INSTANCE_BUMP_LEDGERS, INSTANCE_BUMP_LEDGERS);
}

/// Pull an already-validated payment into the contract and burn its share.
fn collect(env: &Env, from: &Address, payment: &Payment, burn_amount: i128) {
    let token = TokenClient::new(env, &payment.token);
    let this = env.current_contract_address();
    token.transfer(from, &this, &payment.amount);
    if burn_amount > 0 {
        // The contract is the direct invoker, so its own auth is implicit.
        token.burn(&this, &burn_amount);
    }
}

/// Push the deadline to `now + extension` without ever shortening it or
/// passing `max_expiration`.
fn extended_expiration(game: &GameData, now: u64) -> u64 {
    let target = now.saturating_add(game.extension);
    game.expiration.max(target).min(game.max_expiration)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
