//! Player-facing message text.

use std::fmt::Write as _;

use lifegame_types::{INVENTORY_CAPACITY, PendingTransfer, PlayerId, PlayerRecord};

/// Players shown by `/top`.
pub const LEADERBOARD_SIZE: usize = 15;

/// Example transfer command shown in help texts.
pub const TRANSFER_EXAMPLE: &str = "give 100$ and an apple to player 123456 with the message hi";

const MEDALS: [&str; 3] = ["🥇", "🥈", "🥉"];

/// Greeting and command list for `/start`.
pub fn welcome(name: &str, record: &PlayerRecord) -> String {
    format!(
        "🎮 GAME OF LIFE\n\n\
         Hi, {name}!\n\
         💰 Balance: {balance}$\n\n\
         📊 Commands:\n\
         /start - begin\n\
         /profile - my profile\n\
         /profile ID - another player's profile\n\
         /balance - balance\n\
         /inventory - inventory\n\
         /top - top players\n\n\
         💬 You can give items and money to other players!\n\
         Example: \"{TRANSFER_EXAMPLE}\"",
        balance = record.balance,
    )
}

/// Full profile card for `/profile`.
pub fn profile(record: &PlayerRecord) -> String {
    let name = if record.display_name.is_empty() {
        "Unknown"
    } else {
        record.display_name.as_str()
    };
    let handle = if record.handle.is_empty() {
        "none"
    } else {
        record.handle.as_str()
    };
    let mut text = format!(
        "👤 PLAYER PROFILE\n\n\
         ID: {id}\n\
         Name: {name}\n\
         Handle: @{handle}\n\
         💰 Balance: {balance}$\n\
         🎒 Items: {count}/{INVENTORY_CAPACITY}\n\n\
         📅 Registered: {registered}",
        id = record.id,
        balance = record.balance,
        count = record.inventory_count(),
        registered = record.registered_at.format("%d.%m.%Y"),
    );
    if !record.inventory.is_empty() {
        text.push_str("\n\n🎒 INVENTORY:");
        push_item_lines(&mut text, record);
    }
    text
}

/// Reply to `/balance`.
pub fn balance(record: &PlayerRecord) -> String {
    format!("💰 Your balance: {}$", record.balance)
}

/// Reply to `/inventory`.
pub fn inventory(record: &PlayerRecord) -> String {
    if record.inventory.is_empty() {
        return "🎒 Your inventory is empty".to_owned();
    }
    let mut text = format!(
        "🎒 YOUR INVENTORY ({}/{INVENTORY_CAPACITY}):",
        record.inventory_count()
    );
    push_item_lines(&mut text, record);
    text
}

fn push_item_lines(text: &mut String, record: &PlayerRecord) {
    for (item, qty) in &record.inventory {
        let _ = write!(text, "\n• {item}: {qty} pcs.");
    }
}

/// Reply to `/top`, given players already sorted richest first.
pub fn leaderboard(players: &[PlayerRecord]) -> String {
    if players.is_empty() {
        return "📊 No players in the ranking yet!".to_owned();
    }
    let mut text = format!("🏆 TOP {LEADERBOARD_SIZE} PLAYERS 🏆\n");
    for (rank, player) in (1_usize..).zip(players.iter().take(LEADERBOARD_SIZE)) {
        let medal = rank
            .checked_sub(1)
            .and_then(|i| MEDALS.get(i))
            .copied()
            .unwrap_or_default();
        let _ = write!(
            text,
            "\n{medal}{rank}. {name}: {balance}$ (ID: {id})",
            name = player.public_name(),
            balance = player.balance,
            id = player.id,
        );
    }
    text
}

/// Offer shown to the receiver of a pending transfer.
pub fn transfer_offer(transfer: &PendingTransfer) -> String {
    let mut text = format!(
        "💸 NEW TRANSFER\n\nFrom: {} (ID: {})",
        transfer.sender_name, transfer.sender_id
    );
    if transfer.money > 0 {
        let _ = write!(text, "\n💰 Money: {}$", transfer.money);
    }
    if !transfer.items.is_empty() {
        let items: Vec<String> = transfer
            .items
            .iter()
            .map(|(item, qty)| format!("{item} ({qty} pcs.)"))
            .collect();
        let _ = write!(text, "\n🎒 Items: {}", items.join(", "));
    }
    if !transfer.message.is_empty() {
        let _ = write!(text, "\n💬 Message: {}", transfer.message);
    }
    text
}

/// Notice to the sender once the receiver accepted.
pub fn transfer_accepted(receiver: PlayerId, transfer: &PendingTransfer) -> String {
    let mut text = format!("✅ Player (ID: {receiver}) accepted your transfer!");
    if transfer.money > 0 {
        let _ = write!(text, "\n💰 Transferred: {}$", transfer.money);
    }
    if !transfer.items.is_empty() {
        let names: Vec<&str> = transfer.items.keys().map(String::as_str).collect();
        let _ = write!(text, "\n🎒 Items: {}", names.join(", "));
    }
    text
}

/// Notice to the sender once the receiver declined.
pub fn transfer_rejected(receiver: PlayerId) -> String {
    format!("❌ Player (ID: {receiver}) rejected your transfer")
}

/// Reply when the transfer command named no receiver.
pub fn transfer_usage() -> String {
    format!("❌ Could not understand the transfer command. Example: '{TRANSFER_EXAMPLE}'")
}

/// Immediate reply to a queued action.
pub fn queued(position: usize) -> String {
    format!("⏳ Your request has been added to the queue (position {position})...")
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::{TimeZone, Utc};

    use super::*;

    fn record(id: i64, name: &str, handle: &str, balance: i64) -> PlayerRecord {
        let registered = Utc.with_ymd_and_hms(2024, 3, 9, 12, 0, 0).single().unwrap_or_default();
        let mut record = PlayerRecord::new(PlayerId(id), name, handle, registered);
        record.balance = balance;
        record
    }

    #[test]
    fn profile_shows_registration_date_and_items() {
        let mut r = record(42, "Ann", "ann", 900);
        r.inventory.insert("apple".to_owned(), 2);
        let text = profile(&r);
        assert!(text.contains("ID: 42"));
        assert!(text.contains("Handle: @ann"));
        assert!(text.contains("🎒 Items: 2/20"));
        assert!(text.contains("📅 Registered: 09.03.2024"));
        assert!(text.ends_with("• apple: 2 pcs."));
    }

    #[test]
    fn profile_of_anonymous_player() {
        let text = profile(&record(1, "", "", 1000));
        assert!(text.contains("Name: Unknown"));
        assert!(text.contains("Handle: @none"));
        assert!(!text.contains("INVENTORY"));
    }

    #[test]
    fn inventory_header_counts_items() {
        let mut r = record(1, "", "", 0);
        assert_eq!(inventory(&r), "🎒 Your inventory is empty");
        r.inventory.insert("bread".to_owned(), 3);
        assert_eq!(inventory(&r), "🎒 YOUR INVENTORY (3/20):\n• bread: 3 pcs.");
    }

    #[test]
    fn leaderboard_medals_first_three() {
        let players = vec![
            record(1, "A", "alpha", 500),
            record(2, "Bee", "", 400),
            record(3, "C", "", 300),
            record(4, "D", "", 200),
        ];
        let text = leaderboard(&players);
        assert!(text.contains("🥇1. @alpha: 500$ (ID: 1)"));
        assert!(text.contains("🥈2. Bee: 400$ (ID: 2)"));
        assert!(text.contains("🥉3. C: 300$"));
        assert!(text.contains("\n4. D: 200$ (ID: 4)"));
        assert_eq!(leaderboard(&[]), "📊 No players in the ranking yet!");
    }

    #[test]
    fn offer_lists_only_what_is_sent() {
        let transfer = PendingTransfer {
            sender_id: PlayerId(1),
            sender_name: "Sam".to_owned(),
            receiver_id: PlayerId(2),
            money: 0,
            items: BTreeMap::from([("apple".to_owned(), 2)]),
            message: String::new(),
            created_at: Utc::now(),
        };
        assert_eq!(
            transfer_offer(&transfer),
            "💸 NEW TRANSFER\n\nFrom: Sam (ID: 1)\n🎒 Items: apple (2 pcs.)"
        );
        assert_eq!(
            transfer_accepted(PlayerId(2), &transfer),
            "✅ Player (ID: 2) accepted your transfer!\n🎒 Items: apple"
        );
    }
}
