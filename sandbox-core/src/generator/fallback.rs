//! Built-in events used when no generated content is available.

use crate::world::{Category, Impacts, OptionDraft};

/// A canned event.
#[derive(Debug, Clone, Copy)]
pub struct CannedEvent {
    pub title: &'static str,
    pub description: &'static str,
    pub options: [CannedOption; 3],
}

#[derive(Debug, Clone, Copy)]
pub struct CannedOption {
    pub text: &'static str,
    pub capital: i64,
    pub reputation: i64,
    pub morale: i64,
    pub risk: u8,
}

impl CannedOption {
    pub fn to_draft(self) -> OptionDraft {
        OptionDraft {
            text: self.text.to_string(),
            impacts: Impacts::new(self.capital, self.reputation, self.morale),
            risk: self.risk,
        }
    }
}

const fn opt(text: &'static str, capital: i64, reputation: i64, morale: i64, risk: u8) -> CannedOption {
    CannedOption {
        text,
        capital,
        reputation,
        morale,
        risk,
    }
}

const CRISIS: &[CannedEvent] = &[
    CannedEvent {
        title: "Ransomware Lockout",
        description: "Attackers have encrypted the customer database and want payment within 24 hours. Customers are already noticing.",
        options: [
            opt("Pay the ransom quietly", -500, -15, -25, 3),
            opt("Restore from backups and go public", -100, 25, 15, 2),
            opt("Call the authorities and wait", 0, 10, -10, 4),
        ],
    },
    CannedEvent {
        title: "Lead Engineer Resigns",
        description: "Your most senior engineer has accepted an offer elsewhere, two weeks before a major release.",
        options: [
            opt("Counter-offer with a raise", -300, 0, 10, 2),
            opt("Hire a contractor to cover", -400, 0, -5, 3),
            opt("Split the work across the team", 0, -5, -20, 4),
        ],
    },
    CannedEvent {
        title: "Supplier Price Shock",
        description: "Your main supplier raised prices by 40% overnight, citing shortages.",
        options: [
            opt("Absorb the new price", -150, 5, -2, 2),
            opt("Switch to a cheaper, lower-quality supplier", 50, -10, -5, 4),
            opt("Renegotiate with a long-term contract", -50, 2, 3, 3),
        ],
    },
];

const OPPORTUNITY: &[CannedEvent] = &[
    CannedEvent {
        title: "Enterprise Pilot Offer",
        description: "A large company wants to pilot your product, but asks for custom features on a tight deadline.",
        options: [
            opt("Accept and build the features", 800, 5, -8, 3),
            opt("Push for a bigger paid contract", 1200, 3, -3, 4),
            opt("Decline and stay focused", 0, -2, 5, 1),
        ],
    },
    CannedEvent {
        title: "Accelerator Invitation",
        description: "A well-known accelerator invites you to its next batch in exchange for equity.",
        options: [
            opt("Join the batch", 500, 15, 5, 2),
            opt("Negotiate better terms", 300, 5, 0, 3),
            opt("Stay independent", 0, 0, 3, 1),
        ],
    },
];

const NORMAL: &[CannedEvent] = &[
    CannedEvent {
        title: "Quarterly Planning",
        description: "The team needs to agree on priorities for the next quarter.",
        options: [
            opt("Focus on new features", -100, 5, 5, 2),
            opt("Pay down technical debt", -50, 0, 10, 1),
            opt("Double down on marketing", -200, 10, 0, 3),
        ],
    },
    CannedEvent {
        title: "Office Lease Renewal",
        description: "Your office lease is up and the landlord wants a higher rent.",
        options: [
            opt("Renew at the higher rent", -150, 0, 5, 1),
            opt("Move to a cheaper space", -50, 0, -5, 2),
            opt("Go fully remote", 100, -2, -8, 3),
        ],
    },
];

const DILEMMA: &[CannedEvent] = &[
    CannedEvent {
        title: "Suspicious Investor",
        description: "An investor offers a large cheque, but rumours link their money to shady dealings.",
        options: [
            opt("Take the money", 300, -35, -20, 4),
            opt("Turn them down", 0, 15, 25, 2),
            opt("Accept a smaller amount with strict terms", 150, -10, 5, 3),
        ],
    },
    CannedEvent {
        title: "Data for Sale",
        description: "A broker offers good money for anonymised user data.",
        options: [
            opt("Sell the data", 600, -30, -15, 5),
            opt("Refuse and publish your privacy stance", 0, 20, 10, 1),
            opt("Ask users to opt in", 100, 5, 0, 2),
        ],
    },
];

const EXTREME_CRISIS: &[CannedEvent] = &[CannedEvent {
    title: "Data Breach Goes Public",
    description: "A journalist has published proof that customer records leaked from your systems. Regulators are asking questions.",
    options: [
        opt("Full disclosure and free credit monitoring", -800, 10, -10, 3),
        opt("Hire crisis PR and lawyers", -600, -10, -15, 4),
        opt("Deny until more facts emerge", 0, -45, -30, 5),
    ],
}];

/// Canned events available for `category`.
pub fn catalogue(category: Category) -> &'static [CannedEvent] {
    match category {
        Category::Crisis => CRISIS,
        Category::Opportunity => OPPORTUNITY,
        Category::Normal => NORMAL,
        Category::Dilemma => DILEMMA,
        Category::ExtremeCrisis => EXTREME_CRISIS,
    }
}

/// Pick a canned event for `category`, rotating by turn.
pub fn pick(category: Category, turn: i64) -> &'static CannedEvent {
    let events = catalogue(category);
    let index = turn.rem_euclid(events.len() as i64) as usize;
    &events[index]
}
