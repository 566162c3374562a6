use async_trait::async_trait;
use rand::Rng;
use rand::seq::IndexedRandom;
use serde::Serialize;
use shared::Language;
use strum_macros::{Display, EnumString};

use super::{ChatResponder, error_response};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ChatIntent {
    Greeting,
    Soil,
    Pest,
    Irrigation,
    Crop,
    Weather,
    Fertilizer,
    Price,
    General,
}

/// Checked top to bottom; the first intent with a keyword contained in the
/// lower-cased message wins.
pub const INTENT_KEYWORDS: &[(ChatIntent, &[&str])] = &[
    (
        ChatIntent::Greeting,
        &[
            "hello",
            "namaste",
            "namaskar",
            "good morning",
            "good afternoon",
            "good evening",
            "नमस्ते",
            "नमस्कार",
            "నమస్కారం",
            "నమస్తే",
        ],
    ),
    (
        ChatIntent::Soil,
        &["soil", "ph level", "ph value", "fertility", "मिट्टी", "మట్టి", "నేల"],
    ),
    (
        ChatIntent::Pest,
        &[
            "pest", "insect", "bug", "aphid", "disease", "कीट", "कीड़", "रोग", "పురుగు", "తెగులు",
        ],
    ),
    (
        ChatIntent::Irrigation,
        &["irrigat", "water", "drip", "sprinkler", "सिंचाई", "पानी", "నీటి", "నీరు"],
    ),
    (
        ChatIntent::Crop,
        &["crop", "seed", "sowing", "harvest", "फसल", "बीज", "పంట", "విత్తన"],
    ),
    (
        ChatIntent::Weather,
        &["weather", "rain", "temperature", "forecast", "मौसम", "बारिश", "వాతావరణ", "వర్షం"],
    ),
    (
        ChatIntent::Fertilizer,
        &[
            "fertilizer",
            "fertiliser",
            "manure",
            "urea",
            "npk",
            "compost",
            "खाद",
            "उर्वरक",
            "ఎరువు",
        ],
    ),
    (
        ChatIntent::Price,
        &["price", "market", "mandi", "sell", "कीमत", "भाव", "मंडी", "ధర", "మార్కెట్"],
    ),
];

pub fn classify(message: &str) -> ChatIntent {
    let text = message.to_lowercase();
    INTENT_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| text.contains(k)))
        .map(|(intent, _)| *intent)
        .unwrap_or(ChatIntent::General)
}

/// Canned replies. Greeting, soil, pest and irrigation have several variants;
/// the rest have exactly one.
pub fn responses(intent: ChatIntent, language: Language) -> &'static [&'static str] {
    use ChatIntent::*;
    use Language::*;

    match (intent, language) {
        (Greeting, En) => &[
            "Hello! I'm your farming assistant. Ask me about soil, crops, pests, irrigation, weather or market prices.",
            "Namaste! How can I help with your farm today?",
            "Hi there! What would you like to know about your crops or soil?",
        ],
        (Greeting, Hi) => &[
            "नमस्ते! मैं आपका खेती सहायक हूँ। मिट्टी, फसल, कीट, सिंचाई, मौसम या बाज़ार भाव के बारे में पूछें।",
            "नमस्कार! आज मैं आपकी खेती में कैसे मदद कर सकता हूँ?",
            "नमस्ते! आप अपनी फसल या मिट्टी के बारे में क्या जानना चाहते हैं?",
        ],
        (Greeting, Te) => &[
            "నమస్కారం! నేను మీ వ్యవసాయ సహాయకుడిని. నేల, పంటలు, పురుగులు, నీటిపారుదల, వాతావరణం లేదా మార్కెట్ ధరల గురించి అడగండి.",
            "నమస్తే! ఈ రోజు మీ పొలానికి నేను ఎలా సహాయం చేయగలను?",
            "హలో! మీ పంటలు లేదా నేల గురించి ఏమి తెలుసుకోవాలనుకుంటున్నారు?",
        ],

        (Soil, En) => &[
            "Test your soil every season. Most crops grow best at pH 6.0 to 7.5; add lime to raise pH, and gypsum with organic matter to improve alkaline soil.",
            "Healthy soil needs organic matter. Add compost or farmyard manure before sowing and rotate with legumes to restore nitrogen.",
            "Use the soil prediction tool with your N, P, K, pH, organic matter and moisture values to get a fertility class and recommendations.",
        ],
        (Soil, Hi) => &[
            "हर मौसम में मिट्टी की जाँच कराएँ। अधिकतर फसलें pH 6.0 से 7.5 पर अच्छी होती हैं; pH बढ़ाने के लिए चूना डालें।",
            "स्वस्थ मिट्टी के लिए जैविक पदार्थ ज़रूरी है। बुवाई से पहले कम्पोस्ट या गोबर की खाद डालें और दलहनी फसलों के साथ फसल चक्र अपनाएँ।",
            "मिट्टी की उर्वरता जानने के लिए N, P, K, pH, जैविक पदार्थ और नमी के मान के साथ मिट्टी पूर्वानुमान टूल का उपयोग करें।",
        ],
        (Soil, Te) => &[
            "ప్రతి సీజన్‌లో నేల పరీక్ష చేయించండి. చాలా పంటలు pH 6.0 నుండి 7.5 మధ్య బాగా పెరుగుతాయి; pH పెంచడానికి సున్నం వేయండి.",
            "ఆరోగ్యకరమైన నేలకు సేంద్రియ పదార్థం అవసరం. విత్తే ముందు కంపోస్ట్ లేదా పశువుల ఎరువు వేయండి మరియు పప్పు పంటలతో పంట మార్పిడి చేయండి.",
            "నేల సారం తెలుసుకోవడానికి N, P, K, pH, సేంద్రియ పదార్థం మరియు తేమ విలువలతో నేల అంచనా సాధనాన్ని ఉపయోగించండి.",
        ],

        (Pest, En) => &[
            "Inspect the underside of leaves twice a week. Yellow sticky traps catch whiteflies and aphids early.",
            "Try a neem oil spray (5 ml per litre of water) for soft-bodied pests before moving to chemical pesticides.",
            "Remove and destroy infected plants, and upload a leaf photo to disease detection for a diagnosis.",
        ],
        (Pest, Hi) => &[
            "सप्ताह में दो बार पत्तियों के नीचे की ओर जाँच करें। पीले चिपचिपे ट्रैप सफेद मक्खी और माहू को जल्दी पकड़ते हैं।",
            "रासायनिक कीटनाशक से पहले नीम तेल का छिड़काव (5 मिली प्रति लीटर पानी) आज़माएँ।",
            "संक्रमित पौधों को हटाकर नष्ट करें, और निदान के लिए पत्ती की फोटो रोग पहचान में अपलोड करें।",
        ],
        (Pest, Te) => &[
            "వారానికి రెండుసార్లు ఆకుల అడుగు భాగాన్ని పరిశీలించండి. పసుపు జిగురు అట్టలు తెల్లదోమ మరియు పేనుబంకను ముందుగానే పట్టుకుంటాయి.",
            "రసాయన పురుగుమందులకు ముందు వేప నూనె పిచికారీ (లీటరు నీటికి 5 మి.లీ) ప్రయత్నించండి.",
            "వ్యాధి సోకిన మొక్కలను తీసివేసి నాశనం చేయండి, నిర్ధారణ కోసం ఆకు ఫోటోను వ్యాధి గుర్తింపులో అప్‌లోడ్ చేయండి.",
        ],

        (Irrigation, En) => &[
            "Water early in the morning or in the evening to reduce evaporation losses.",
            "Drip irrigation saves 30-50% water compared to flood irrigation and keeps leaves dry.",
            "Check soil moisture at root depth before irrigating; if it feels damp, wait another day.",
        ],
        (Irrigation, Hi) => &[
            "वाष्पीकरण कम करने के लिए सुबह जल्दी या शाम को सिंचाई करें।",
            "ड्रिप सिंचाई बाढ़ सिंचाई की तुलना में 30-50% पानी बचाती है।",
            "सिंचाई से पहले जड़ की गहराई पर मिट्टी की नमी जाँचें; नम हो तो एक दिन और रुकें।",
        ],
        (Irrigation, Te) => &[
            "ఆవిరి నష్టం తగ్గించడానికి ఉదయాన్నే లేదా సాయంత్రం నీరు పెట్టండి.",
            "బిందు సేద్యం వరద పారుదల కంటే 30-50% నీటిని ఆదా చేస్తుంది.",
            "నీరు పెట్టే ముందు వేరు లోతులో నేల తేమను చూడండి; తడిగా ఉంటే మరో రోజు ఆగండి.",
        ],

        (Crop, En) => &[
            "Choose crops that match your season and soil. Enter your soil nutrients, temperature, humidity, pH and rainfall in the crop suggestion tool for a recommendation.",
        ],
        (Crop, Hi) => &[
            "अपने मौसम और मिट्टी के अनुसार फसल चुनें। सुझाव के लिए फसल सुझाव टूल में मिट्टी के पोषक तत्व, तापमान, नमी, pH और वर्षा दर्ज करें।",
        ],
        (Crop, Te) => &[
            "మీ సీజన్ మరియు నేలకు సరిపోయే పంటను ఎంచుకోండి. సూచన కోసం పంట సూచన సాధనంలో నేల పోషకాలు, ఉష్ణోగ్రత, తేమ, pH మరియు వర్షపాతం నమోదు చేయండి.",
        ],

        (Weather, En) => &[
            "Check the local forecast before spraying or applying fertilizer. Avoid field operations just before heavy rain and protect young plants during heat waves.",
        ],
        (Weather, Hi) => &[
            "छिड़काव या खाद डालने से पहले स्थानीय मौसम पूर्वानुमान देखें। भारी बारिश से ठीक पहले खेत का काम न करें।",
        ],
        (Weather, Te) => &[
            "పిచికారీ లేదా ఎరువు వేసే ముందు స్థానిక వాతావరణ సూచన చూడండి. భారీ వర్షానికి ముందు పొలం పనులు చేయవద్దు.",
        ],

        (Fertilizer, En) => &[
            "Apply fertilizer based on a soil test. Split nitrogen into two or three doses, apply phosphorus at sowing, and combine chemical fertilizers with compost.",
        ],
        (Fertilizer, Hi) => &[
            "मिट्टी परीक्षण के आधार पर खाद डालें। नाइट्रोजन को दो-तीन बार में दें और रासायनिक खाद के साथ कम्पोस्ट मिलाएँ।",
        ],
        (Fertilizer, Te) => &[
            "నేల పరీక్ష ఆధారంగా ఎరువులు వేయండి. నత్రజనిని రెండు మూడు దఫాలుగా ఇవ్వండి మరియు రసాయన ఎరువులతో పాటు కంపోస్ట్ వాడండి.",
        ],

        (Price, En) => &[
            "Compare prices at nearby mandis before selling, and store produce when prices are low if you have proper storage.",
        ],
        (Price, Hi) => &[
            "बेचने से पहले आसपास की मंडियों के भाव की तुलना करें, और भाव कम हों तो उचित भंडारण में उपज रखें।",
        ],
        (Price, Te) => &[
            "అమ్మే ముందు సమీప మార్కెట్ల ధరలను పోల్చండి, ధరలు తక్కువగా ఉంటే సరైన నిల్వలో ఉంచండి.",
        ],

        (General, En) => &[
            "I can help with soil health, crop selection, pests, irrigation, fertilizers, weather and market prices. Please ask a farming question.",
        ],
        (General, Hi) => &[
            "मैं मिट्टी, फसल चयन, कीट, सिंचाई, खाद, मौसम और बाज़ार भाव में मदद कर सकता हूँ। कृपया खेती से जुड़ा प्रश्न पूछें।",
        ],
        (General, Te) => &[
            "నేల, పంట ఎంపిక, పురుగులు, నీటిపారుదల, ఎరువులు, వాతావరణం మరియు మార్కెట్ ధరల గురించి నేను సహాయం చేయగలను. దయచేసి వ్యవసాయ ప్రశ్న అడగండి.",
        ],
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordResponder;

impl KeywordResponder {
    pub fn reply<R: Rng + ?Sized>(&self, message: &str, language: Language, rng: &mut R) -> String {
        let intent = classify(message);
        log::debug!("Chat intent {} ({})", intent, language);
        responses(intent, language)
            .choose(rng)
            .map(|text| text.to_string())
            .unwrap_or_else(|| error_response(language).to_string())
    }
}

#[async_trait]
impl ChatResponder for KeywordResponder {
    async fn respond(&self, message: &str, language: Language) -> String {
        self.reply(message, language, &mut rand::rng())
    }

    fn name(&self) -> &'static str {
        "keyword"
    }
}
