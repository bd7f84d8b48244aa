//! Keyword reply table. Input is lowercased, then each rule is tested in
//! declaration order; the first rule with any keyword contained in the input wins.
//!
//! The table mixes Marathi and English keywords and is kept literal, including
//! short keywords such as `hi` that also match inside longer words.

use serde::Serialize;

/// What the user appears to be asking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Greeting,
    Name,
    Wellbeing,
    Thanks,
    Farewell,
    Time,
    Weather,
    Identity,
    Capabilities,
    Fallback,
}

struct ResponseRule {
    intent: Intent,
    keywords: &'static [&'static str],
    reply: &'static str,
}

/// Reply when no rule matches.
pub const FALLBACK_REPLY: &str = "मला समजले. तुम्ही आणखी काही विचारू शकता.";

const RULES: &[ResponseRule] = &[
    ResponseRule {
        intent: Intent::Greeting,
        keywords: &["नमस्कार", "हॅलो", "hello", "hi"],
        reply: "नमस्कार! मी शेवंता आहे. तुम्हाला कसे मदत करू शकते?",
    },
    ResponseRule {
        intent: Intent::Name,
        keywords: &["तुझे नाव", "name", "नाव"],
        reply: "माझे नाव शेवंता आहे. मी एक आवाज सहाय्यक आहे.",
    },
    ResponseRule {
        intent: Intent::Wellbeing,
        keywords: &["कसे आहेस", "how are you", "कसे"],
        reply: "मी ठीक आहे, धन्यवाद! तुम्ही कसे आहात?",
    },
    ResponseRule {
        intent: Intent::Thanks,
        keywords: &["धन्यवाद", "thank you", "thanks"],
        reply: "तुमचे स्वागत आहे! मला तुमची मदत करून आनंद झाला.",
    },
    ResponseRule {
        intent: Intent::Farewell,
        keywords: &["बाय", "bye", "goodbye"],
        reply: "अलविदा! पुन्हा भेटूया!",
    },
    ResponseRule {
        intent: Intent::Time,
        keywords: &["time", "वेळ"],
        reply: "मला वेळ माहित नाही, पण मी तुम्हाला मदत करू शकते.",
    },
    ResponseRule {
        intent: Intent::Weather,
        keywords: &["weather", "हवामान"],
        reply: "मला हवामानाची माहिती नाही, पण तुम्ही बाहेर पाहू शकता.",
    },
    ResponseRule {
        intent: Intent::Identity,
        keywords: &["तू कोण", "who are you", "कोण"],
        reply: "मी शेवंता आहे, तुमची आवाज सहाय्यक. मी तुम्हाला मराठी आणि इंग्रजीमध्ये मदत करू शकते.",
    },
    ResponseRule {
        intent: Intent::Capabilities,
        keywords: &["काय करतेस", "what do you do", "काय"],
        reply: "मी तुमच्याशी बोलू शकते आणि तुमच्या प्रश्नांची उत्तरे देऊ शकते. तुम्ही मला काहीही विचारू शकता.",
    },
];

fn matching_rule(text: &str) -> Option<&'static ResponseRule> {
    let lower = text.to_lowercase();
    RULES
        .iter()
        .find(|rule| rule.keywords.iter().any(|k| lower.contains(k)))
}

/// Classify `text` into the first matching intent.
pub fn classify(text: &str) -> Intent {
    matching_rule(text).map_or(Intent::Fallback, |rule| rule.intent)
}

/// Canned reply for `text`. Total and deterministic.
pub fn select_response(text: &str) -> &'static str {
    matching_rule(text).map_or(FALLBACK_REPLY, |rule| rule.reply)
}

/// Reply text declared for an intent.
pub fn reply_for(intent: Intent) -> &'static str {
    RULES
        .iter()
        .find(|rule| rule.intent == intent)
        .map_or(FALLBACK_REPLY, |rule| rule.reply)
}
