//! Operator-facing message rendering (Telegram HTML).

use html_escape::encode_text;

use crate::models::{Flight, MembershipType, Transaction};

pub fn new_transaction_msg(transaction: &Transaction, suggested: Option<MembershipType>) -> String {
    let counterparty = transaction
        .counterparty_name
        .as_deref()
        .unwrap_or("unknown counterparty");
    let suggestion = match suggested {
        Some(t) => format!("suggested type: <b>{t}</b>"),
        None => "amount not recognized, pair manually".to_string(),
    };
    let mut msg = format!(
        "New transaction <code>{}</code>\n{} {} on {} from {}\n{}",
        encode_text(&transaction.id),
        transaction.amount,
        encode_text(&transaction.currency),
        transaction.date,
        encode_text(counterparty),
        suggestion,
    );
    if let Some(message) = &transaction.message {
        msg.push_str(&format!("\nmessage: <i>{}</i>", encode_text(message)));
    }
    msg
}

pub fn offending_flight_msg(flight: &Flight) -> String {
    format!(
        "Flight <code>{}</code> by <b>{}</b> on {} has no valid membership!",
        encode_text(&flight.id),
        encode_text(&flight.pilot.username),
        flight.date(),
    )
}

pub fn start_msg() -> String {
    "Hello, I am the club cashier. I watch the bank account and XContest \
     flights and keep memberships in sync. See /help."
        .to_string()
}

pub fn help_msg() -> String {
    "Commands:\n\
     /pair &lt;transaction_id&gt; &lt;daily|yearly&gt; &lt;pilot_username&gt; \
     - pair a transaction to a new membership\n\
     /help - this message"
        .to_string()
}
