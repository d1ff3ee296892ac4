//! Unit tests for order intake, amounts and canonical hashing

use rand::Rng;
use resolver::crypto::HashLock;
use resolver::error::ResolverError;
use resolver::order::{
    build_order, build_order_with_salt, compute_order_hash, parse_amount, rescale, AmountInput,
    OrderHash, OrderHashInput, SwapRequest,
};
use resolver::registry::OrderRegistry;
use resolver::timelock::{compute_time_lock, TimeLockDurations};
use std::collections::HashSet;
use std::str::FromStr;

#[path = "helpers.rs"]
mod test_helpers;
use test_helpers::{
    create_default_config, create_default_swap_request, create_swap_request, DUMMY_AMOUNT_BASE_UNITS,
    DUMMY_CUSTODIAL_NETWORK, DUMMY_ESCROW_NETWORK, DUMMY_MAKER_ADDR, DUMMY_RECEIVER_ADDR,
    DUMMY_USDC_ADDR_CUSTODIAL, DUMMY_USDC_ADDR_ESCROW,
};

const SALT: [u8; 32] = [9u8; 32];
const NOW: u64 = 1_700_000_000;

fn random_address(rng: &mut impl Rng) -> String {
    format!("0x{}", hex::encode(rng.gen::<[u8; 20]>()))
}

fn validation_message(request: &SwapRequest) -> String {
    match build_order_with_salt(&create_default_config(), request, SALT) {
        Err(ResolverError::Validation(message)) => message,
        other => panic!("expected validation error, got {:?}", other),
    }
}

// ============================================================================
// AMOUNT TESTS
// ============================================================================

/// What is tested: decimal strings scale into base units
/// Why: Clients send human amounts; chains work in base units
#[test]
fn test_parse_amount_scales_decimals() {
    assert_eq!(parse_amount("100", 6).unwrap(), 100_000_000);
    assert_eq!(parse_amount("1.5", 6).unwrap(), 1_500_000);
    assert_eq!(parse_amount("0.000001", 6).unwrap(), 1);
    assert_eq!(parse_amount(".5", 2).unwrap(), 50);
    assert_eq!(parse_amount("2.500", 2).unwrap(), 250);
    assert_eq!(parse_amount("7", 0).unwrap(), 7);
    assert_eq!(
        parse_amount("1", 18).unwrap(),
        1_000_000_000_000_000_000
    );
}

/// What is tested: malformed, zero, negative and over-precise amounts are rejected
/// Why: Amount parsing must never round or wrap silently
#[test]
fn test_parse_amount_rejects_invalid() {
    for bad in ["", ".", "abc", "-1", "+1", "1e6", "1.2.3", "0", "0.000", "1.0000001"] {
        assert!(parse_amount(bad, 6).is_err(), "accepted {:?}", bad);
    }
    // Overflow
    assert!(parse_amount(&"9".repeat(40), 6).is_err());
}

/// What is tested: rescale between decimals at a 1:1 rate
/// Why: Source and destination tokens may use different decimals
#[test]
fn test_rescale() {
    assert_eq!(rescale(1_500_000, 6, 18).unwrap(), 1_500_000_000_000_000_000);
    assert_eq!(rescale(1_500_000_000_000_000_000, 18, 6).unwrap(), 1_500_000);
    assert_eq!(rescale(42, 6, 6).unwrap(), 42);
    assert!(rescale(1, 18, 6).is_err());
    assert!(rescale(u128::MAX, 0, 18).is_err());
}

// ============================================================================
// INTAKE TESTS
// ============================================================================

/// What is tested: a valid request becomes an order with scaled amounts and resolved tokens
/// Why: Every later step works from the immutable order
#[test]
fn test_build_order() {
    let order =
        build_order_with_salt(&create_default_config(), &create_default_swap_request(), SALT)
            .unwrap();

    assert_eq!(order.maker, DUMMY_MAKER_ADDR);
    assert_eq!(order.receiver, DUMMY_RECEIVER_ADDR);
    assert_eq!(order.source_network, DUMMY_CUSTODIAL_NETWORK);
    assert_eq!(order.destination_network, DUMMY_ESCROW_NETWORK);
    assert_eq!(order.source_asset, DUMMY_USDC_ADDR_CUSTODIAL);
    assert_eq!(order.destination_asset, DUMMY_USDC_ADDR_ESCROW);
    assert_eq!(order.making_amount, DUMMY_AMOUNT_BASE_UNITS);
    assert_eq!(order.taking_amount, DUMMY_AMOUNT_BASE_UNITS);
    assert_eq!(order.salt, SALT);
}

/// What is tested: the receiver defaults to the maker and amounts may be JSON numbers
/// Why: Same-address swaps omit destinationAddress; many clients send numeric amounts
#[test]
fn test_request_defaults_and_numeric_amount() {
    let request: SwapRequest = serde_json::from_value(serde_json::json!({
        "fromNetwork": "Monad",
        "toNetwork": "sepolia",
        "fromToken": "usdc",
        "toToken": "USDC",
        "amount": 2.5,
        "userAddress": DUMMY_MAKER_ADDR
    }))
    .unwrap();
    assert_eq!(request.amount, Some(AmountInput::Number(serde_json::Number::from_f64(2.5).unwrap())));

    let order = build_order_with_salt(&create_default_config(), &request, SALT).unwrap();
    assert_eq!(order.receiver, DUMMY_MAKER_ADDR);
    assert_eq!(order.making_amount, 2_500_000);
    assert_eq!(order.source_network, DUMMY_CUSTODIAL_NETWORK);
    assert_eq!(order.source_token, "USDC");
}

/// What is tested: a cross-decimal swap rescales the taking amount
/// Why: USDC (6) to WETH (18) must not lose or invent value
#[test]
fn test_cross_decimal_swap() {
    let mut request = SwapRequest {
        to_network: Some(DUMMY_CUSTODIAL_NETWORK.to_string()),
        from_network: Some(DUMMY_ESCROW_NETWORK.to_string()),
        ..create_default_swap_request()
    };
    request.to_token = Some("WETH".to_string());
    let order = build_order_with_salt(&create_default_config(), &request, SALT).unwrap();
    assert_eq!(order.making_amount, 100_000_000);
    assert_eq!(order.taking_amount, 100_000_000_000_000_000_000);
}

/// What is tested: each missing field is reported by name
/// Why: Clients need to know which field to fix
#[test]
fn test_missing_fields_reported() {
    let base = create_default_swap_request();
    let cases: Vec<(SwapRequest, &str)> = vec![
        (SwapRequest { from_network: None, ..base.clone() }, "fromNetwork"),
        (SwapRequest { to_network: Some("  ".to_string()), ..base.clone() }, "toNetwork"),
        (SwapRequest { from_token: None, ..base.clone() }, "fromToken"),
        (SwapRequest { to_token: None, ..base.clone() }, "toToken"),
        (SwapRequest { amount: None, ..base.clone() }, "amount"),
        (SwapRequest { user_address: None, ..base.clone() }, "userAddress"),
    ];
    for (request, field) in cases {
        assert_eq!(
            validation_message(&request),
            format!("Missing required field: {}", field)
        );
    }
}

/// What is tested: unknown networks, same-network swaps and unknown tokens are rejected
/// Why: Validation happens before any chain interaction
#[test]
fn test_invalid_routes_rejected() {
    let base = create_default_swap_request();

    let unknown = SwapRequest {
        to_network: Some("solana".to_string()),
        ..base.clone()
    };
    assert_eq!(validation_message(&unknown), "Unsupported network: solana");

    let same = SwapRequest {
        to_network: Some(DUMMY_CUSTODIAL_NETWORK.to_uppercase()),
        ..base.clone()
    };
    assert_eq!(
        validation_message(&same),
        "Source and destination networks must be different"
    );

    let token = SwapRequest {
        to_token: Some("WETH".to_string()),
        ..base.clone()
    };
    assert_eq!(validation_message(&token), "Unsupported token WETH on sepolia");
}

/// What is tested: malformed addresses and amounts are rejected
/// Why: Addresses are decoded into canonical bytes for hashing
#[test]
fn test_invalid_address_and_amount_rejected() {
    let base = create_default_swap_request();

    let bad_maker = SwapRequest {
        user_address: Some("0xnothex".to_string()),
        ..base.clone()
    };
    assert!(validation_message(&bad_maker).contains("Invalid userAddress"));

    let bad_receiver = SwapRequest {
        destination_address: Some("TR7NHqjeKQxGTCi8q8ZY4pL8otSzgjLj6t".to_string()),
        ..base.clone()
    };
    assert!(validation_message(&bad_receiver).contains("Invalid destinationAddress"));

    let bad_amount = SwapRequest {
        amount: Some(AmountInput::Text("-5".to_string())),
        ..base.clone()
    };
    assert!(validation_message(&bad_amount).starts_with("Invalid amount"));
}

// ============================================================================
// HASHING TESTS
// ============================================================================

/// What is tested: the order hash is deterministic and independent of address case
/// Why: Identity must come from canonical bytes, not display strings
#[test]
fn test_order_hash_canonical() {
    let config = create_default_config();
    let lower = create_default_swap_request();
    let upper = SwapRequest {
        user_address: Some(format!("0X{}", &DUMMY_MAKER_ADDR[2..].to_uppercase())),
        ..lower.clone()
    };

    let a = build_order_with_salt(&config, &lower, SALT).unwrap();
    let b = build_order_with_salt(&config, &lower, SALT).unwrap();
    let c = build_order_with_salt(&config, &upper, SALT).unwrap();
    assert_eq!(a.order_hash, b.order_hash);
    assert_eq!(a.order_hash, c.order_hash);

    let other_salt = build_order_with_salt(&config, &lower, [1u8; 32]).unwrap();
    assert_ne!(a.order_hash, other_salt.order_hash);
}

/// What is tested: moving bytes between adjacent fields changes the hash
/// Why: Length prefixes prevent concatenation ambiguity
#[test]
fn test_order_hash_field_boundaries() {
    let salt = [0u8; 32];
    let base = OrderHashInput {
        source_network: "ab",
        source_chain_id: 1,
        maker: &[1, 2],
        source_asset: &[3],
        making_amount: 10,
        destination_network: "cd",
        destination_chain_id: 2,
        receiver: &[4],
        destination_asset: &[5],
        taking_amount: 10,
        salt: &salt,
    };
    let shifted = OrderHashInput {
        maker: &[1],
        source_asset: &[2, 3],
        ..base
    };
    assert_ne!(compute_order_hash(&base), compute_order_hash(&shifted));
}

/// What is tested: 10,000 randomized orders created in the registry get distinct hashes
/// Why: The hash is the registry key; a collision would merge two swaps
#[tokio::test]
async fn test_created_order_hashes_unique() {
    let config = create_default_config();
    let registry = OrderRegistry::in_memory();
    let time_lock = compute_time_lock(NOW, &TimeLockDurations::default()).unwrap();
    let mut rng = rand::thread_rng();
    let mut seen = HashSet::new();
    let mut last = None;

    for _ in 0..10_000 {
        let (from, to) = if rng.gen::<bool>() {
            (DUMMY_CUSTODIAL_NETWORK, DUMMY_ESCROW_NETWORK)
        } else {
            (DUMMY_ESCROW_NETWORK, DUMMY_CUSTODIAL_NETWORK)
        };
        let mut request = create_swap_request(from, to);
        request.amount = Some(AmountInput::Text(format!(
            "{}.{:06}",
            rng.gen_range(0..1_000_000u64),
            rng.gen_range(1..1_000_000u32)
        )));
        request.user_address = Some(random_address(&mut rng));
        request.destination_address = Some(random_address(&mut rng));

        let order = build_order(&config, &request).unwrap();
        let order_hash = registry
            .create(order.clone(), HashLock::generate(), time_lock, NOW)
            .await
            .unwrap();
        assert_eq!(order_hash, order.order_hash);
        assert!(seen.insert(order_hash));
        last = Some(order);
    }
    assert_eq!(registry.list_orders().await.len(), 10_000);

    let repeated = last.unwrap();
    assert!(matches!(
        registry
            .create(repeated, HashLock::generate(), time_lock, NOW)
            .await,
        Err(ResolverError::Duplicate(_))
    ));
}

/// What is tested: OrderHash display and parsing
/// Why: Hashes are path parameters in the API and file names in storage
#[test]
fn test_order_hash_display_and_parse() {
    let hash = OrderHash([0xabu8; 32]);
    let text = hash.to_string();
    assert_eq!(text, format!("0x{}", "ab".repeat(32)));
    assert_eq!(OrderHash::from_str(&text).unwrap(), hash);
    assert!(OrderHash::from_str("0x1234").is_err());

    let json = serde_json::to_string(&hash).unwrap();
    assert_eq!(json, format!("\"{}\"", text));
}
