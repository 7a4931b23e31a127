// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Test data generators for abuse simulation.

use contact_relay::fields::FormFields;

/// A plausible human submission, varied by index.
pub fn human_submission(i: usize) -> FormFields {
    let names = ["Jo", "Mary-Jane O'Neil", "José Núñez", "Sam Lee"];
    let subjects = ["Hi there", "Project inquiry", "Speaking invitation", "Quick question"];
    FormFields::new(
        names[i % names.len()],
        format!("person{}@example.org", i % 7),
        subjects[i % subjects.len()],
        format!("Hello, I saw portfolio entry number {i} and would like to talk about it."),
    )
}

/// Submissions a naive bot produces: every visible field filled, decoy
/// included.
pub fn honeypot_bot_submission(i: usize) -> FormFields {
    human_submission(i).with_honeypot(format!("https://seo-{i}.example.com"))
}

/// Messages the content heuristics should flag.
pub fn spam_messages() -> Vec<&'static str> {
    vec![
        "Congratulations you are our lottery winner, reply today",
        "Click here now to claim your prize",
        "Make money fast working from home",
        "Earn $5000 per week guaranteed",
        "Best deals $$$$ available",
        "Reply now!!!!! limited offer",
        "cheap cheap cheap cheap cheap cheap cheap cheap cheap deals",
        "https://a.example https://b.example https://c.example https://d.example https://e.example https://f.example",
    ]
}

/// Markup payloads that must never reach the relay intact.
pub fn markup_payloads() -> Vec<&'static str> {
    vec![
        "<script>alert(1)</script>Hello there friend",
        "<img src=x onerror=alert(1)>Hello there friend",
        "Hello <b>there</b> friend, how are you",
        "<a href=\"javascript:alert(1)\">Hello there friend</a>",
    ]
}

/// Addresses that must fail the email pattern.
pub fn invalid_emails() -> Vec<&'static str> {
    vec!["not-an-email", "missing@tld", "@example.com", "a b@c.io", "a@b", "two@@example.com"]
}
