//! Pure bid-legality rules, shared by every front end so the rule chain
//! exists exactly once.

use crate::auction::Auction;
use crate::events::RejectReason;
use crate::types::{BidderId, Price};

/// Decide whether a proposed bid is legal given the current auction state.
///
/// Rules are evaluated in a fixed order and the first failure wins:
/// 1. the bidder must be registered on the auction
/// 2. the auction must be in progress
/// 3. the bidder must not hold the most recent bid
/// 4. an opening bid must be at least the starting price
/// 5. a subsequent bid must be at least `current_price + bid_step`
///    (larger jump bids are always legal)
/// 6. the bidder's countdown must have time remaining
///
/// `bidder_time_left_secs` is the countdown reading supplied by the
/// caller; a timer reaching zero rejects nothing retroactively, it only
/// fails this check for future bids until the bidder is re-selected.
pub fn validate_bid(
    auction: &Auction,
    bidder_id: BidderId,
    amount: Price,
    bidder_time_left_secs: u64,
) -> Result<(), RejectReason> {
    if auction.bidder(bidder_id).is_none() {
        return Err(RejectReason::UnknownBidder { bidder_id });
    }
    if !auction.is_active() {
        return Err(RejectReason::AuctionNotActive);
    }
    if auction.last_bidder_id == Some(bidder_id) {
        return Err(RejectReason::ConsecutiveBid);
    }

    let starting_price = auction.settings.starting_price;
    if auction.bids().is_empty() {
        if amount < starting_price {
            return Err(RejectReason::BelowStartingPrice { starting_price });
        }
    } else {
        let minimum = auction.current_price + auction.settings.bid_step;
        if amount < minimum {
            return Err(RejectReason::BelowMinimumIncrement { minimum });
        }
    }

    if bidder_time_left_secs == 0 {
        return Err(RejectReason::BidderTimeExpired);
    }

    Ok(())
}
