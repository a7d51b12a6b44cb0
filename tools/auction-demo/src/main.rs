// Auction Demo Tool
// Drives a full scripted session against the in-memory store: register
// bidders, start, select/bid/cancel under the operator flow, end, and
// print the frozen result.

use std::sync::Arc;

use auction_core::{AuctionEvent, AuctionSettings, NewBidder};
use auction_store::MemoryStore;
use auction_timer::SystemClock;
use bidding_engine::{BiddingEngine, EngineConfig};

fn main() {
    tracing_subscriber::fmt::init();

    println!("Auction Bidding Engine Demo");
    println!("===========================\n");

    let engine = BiddingEngine::new(
        Arc::new(MemoryStore::new()),
        Arc::new(SystemClock::new()),
        EngineConfig::default(),
    )
    .expect("start engine");
    let events = engine.subscribe();

    // Stage the session
    let settings = AuctionSettings {
        starting_price: 1_000_000,
        bid_step: 100_000,
        bid_duration_secs: 60,
        round_duration_secs: None,
    };
    let auction = engine.create_auction("Demo Lot", settings).expect("create auction");
    let id = auction.id;
    println!("Created auction {id} (starting price 1,000,000, step 100,000)");

    for name in ["Alice", "Bob", "Carol"] {
        let bidder = engine
            .register_bidder(&id, NewBidder { name: name.to_string(), ..NewBidder::default() })
            .expect("register bidder");
        println!("  registered #{} {}", bidder.id, bidder.name);
    }

    engine.start(&id).expect("start auction");
    println!("\nAuction started\n");

    // Scripted operator flow: (bidder, amount)
    let script = [
        (1, 1_000_000u64), // opening bid at the starting price
        (1, 1_100_000),    // rejected: consecutive
        (2, 1_050_000),    // rejected: below minimum increment
        (2, 1_100_000),    // accepted
        (3, 1_500_000),    // accepted jump bid
    ];

    for (bidder_id, amount) in script {
        let state = engine.select_bidder(&id, bidder_id).expect("select bidder");
        println!(
            "select #{bidder_id} (window {}s) -> bid {amount}",
            state.remaining_secs
        );
        match engine.place_bid(&id, bidder_id, amount) {
            Ok((auction, bid)) => {
                println!("  accepted bid {} at {}, price now {}", bid.id, bid.amount, auction.current_price)
            }
            Err(err) => println!("  rejected: {err}"),
        }
    }

    println!("\nCancelling the last bid...");
    let auction = engine.cancel_last_bid(&id).expect("cancel last bid");
    println!("  price restored to {}", auction.current_price);

    let (_, result) = engine.end(&id).expect("end auction");
    println!("\nResult");
    println!("------");
    println!("winner:      {}", result.winner_name.as_deref().unwrap_or("(none)"));
    println!("final price: {}", result.final_price);
    println!("total bids:  {}", result.total_bids);
    println!("duration:    {}s", result.duration_secs);
    for bid in &result.bid_log {
        println!("  round {} bidder #{} -> {}", bid.round, bid.bidder_id, bid.amount);
    }

    let accepted = events
        .try_iter()
        .filter(|e| matches!(e, AuctionEvent::BidAccepted { .. }))
        .count();
    println!("\n({accepted} BidAccepted events published)");
}
