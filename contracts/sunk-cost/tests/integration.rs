use soroban_sdk::{
    testutils::{Address as _, Ledger},
    token::{StellarAssetClient, TokenClient},
    Address, Env,
};

use stellarcade_sunk_cost::{Error, GameParams, Payment, SunkCost, SunkCostClient};

fn create_token<'a>(env: &'a Env, token_admin: &Address) -> (Address, StellarAssetClient<'a>) {
    let token_contract = env.register_stellar_asset_contract_v2(token_admin.clone());
    let token_client = StellarAssetClient::new(env, &token_contract.address());
    (token_contract.address(), token_client)
}

fn payment(token: &Address, amount: i128) -> Payment {
    Payment {
        token: token.clone(),
        amount,
    }
}

#[test]
fn test_bidding_war_until_claim() {
    let env = Env::default();
    env.ledger().with_mut(|li| {
        li.timestamp = 10_000;
    });

    let creator = Address::generate(&env);
    let players = [Address::generate(&env), Address::generate(&env)];
    let token_admin = Address::generate(&env);

    let (token_addr, token_sac) = create_token(&env, &token_admin);

    let contract_id = env.register(SunkCost, ());
    let game = SunkCostClient::new(&env, &contract_id);

    env.mock_all_auths();
    token_sac.mint(&creator, &1_000);
    for player in players.iter() {
        token_sac.mint(player, &10_000);
    }

    // Deadline in 600 s, each bid pushes it to at least now + 300 s,
    // never past 11_000.
    let game_id = game.create_game(
        &creator,
        &GameParams {
            token: token_addr.clone(),
            expiration: 10_600,
            max_expiration: 11_000,
            initial_buy_in: 100,
            buy_in_increment: 10,
            burn_amount: 5,
            extension: 300,
        },
        &payment(&token_addr, 100),
    );
    assert_eq!(game_id, 0);

    let token = TokenClient::new(&env, &token_addr);
    let mut expected_pot = 95i128;
    let mut now = 10_000u64;

    // Players alternate, each bidding 250 s after the last one.
    for round in 0..6usize {
        now += 250;
        env.ledger().with_mut(|li| {
            li.timestamp = now;
        });

        let bidder = &players[round % 2];
        let price = game.current_buy_in(&game_id);
        let deadline = game.expiration(&game_id);
        if now >= deadline {
            assert_eq!(
                game.try_buy_in(&game_id, bidder, &payment(&token_addr, price)),
                Err(Ok(Error::GameExpired))
            );
            break;
        }

        game.buy_in(&game_id, bidder, &payment(&token_addr, price));
        expected_pot += price - 5;

        assert_eq!(game.current_winner(&game_id), bidder.clone());
        assert_eq!(game.current_buy_in(&game_id), price + 10);
        let new_deadline = game.expiration(&game_id);
        assert!(new_deadline >= deadline);
        assert!(new_deadline <= 11_000);
        assert_eq!(token.balance(&contract_id), expected_pot);
    }

    // 10_250 keeps 10_600, 10_500 -> 10_800, 10_750 -> 11_000 (capped),
    // the bid at 11_000 is too late.
    assert_eq!(game.expiration(&game_id), 11_000);
    assert!(game.expired(&game_id));
    assert_eq!(game.current_winner(&game_id), players[0]);
    // 95 + 105 + 115 + 125
    assert_eq!(expected_pot, 440);
    assert_eq!(game.current_pot(&game_id), 440);

    let paid = game.claim(&game_id);
    assert_eq!(paid, 440);
    assert!(game.claimed(&game_id));
    assert_eq!(token.balance(&contract_id), 0);
    // 10_000 - 110 - 130 + 440
    assert_eq!(token.balance(&players[0]), 10_200);
    // 10_000 - 120
    assert_eq!(token.balance(&players[1]), 9_880);

    assert_eq!(game.try_claim(&game_id), Err(Ok(Error::AlreadyClaimed)));
    assert_eq!(game.num_games(), 1);
}
