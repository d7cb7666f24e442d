//! crates/career_assistant_core/src/extractor.rs
//!
//! Rule-based keyword and intent extraction. Turns a raw user message into a
//! `QueryDescriptor` using fixed pattern tables; it never fails and never does I/O.

use crate::domain::{IntentType, QueryDescriptor};
use lazy_static::lazy_static;
use regex::Regex;

//=========================================================================================
// Pattern Tables
//=========================================================================================

const INTENT_PATTERNS: &[(IntentType, &[&str])] = &[
    (
        IntentType::Internship,
        &[
            r"\b(magang|internship|intern|praktek kerja|praktik kerja|pkl)\b",
            r"\bcari\b.*\bmagang\b",
            r"\bintern\b.*\bprogram\b",
        ],
    ),
    (
        IntentType::Job,
        &[
            r"\b(kerja|job|jobs|pekerjaan|lowongan|karir|karier|loker|vacancy)\b",
            r"\bcari\b.*\bkerja\b",
            r"\blowongan\b.*\bkerja\b",
            r"\bfull\s?time\b",
        ],
    ),
    (
        IntentType::Course,
        &[
            r"\b(kursus|course|courses|pelatihan|training|belajar|bootcamp|sertifikasi)\b",
            r"\bcari\b.*\bkursus\b",
            r"\bingin\b.*\bbelajar\b",
        ],
    ),
    (
        IntentType::Greeting,
        &[
            r"\b(hai|halo|hallo|hello|hi|hey|selamat (pagi|siang|sore|malam))\b",
            r"\bapa kabar\b",
            r"\bmulai\b",
        ],
    ),
];

const FIELD_TAXONOMY: &[(&str, &str)] = &[
    (
        "IT",
        r"\b(it|ti|teknologi informasi|informatika|programmer|programming|developer|software|coding|web|backend|frontend|data science|data analyst|python|java)\b",
    ),
    ("Marketing", r"\b(marketing|pemasaran|digital marketing|social media|media sosial|content creator|branding)\b"),
    ("Finance", r"\b(finance|keuangan|akuntansi|accounting|akuntan|pajak|perbankan|banking)\b"),
    ("HR", r"\b(hr|hrd|human resources?|sdm|sumber daya manusia|recruiter)\b"),
    ("Sales", r"\b(sales|penjualan|bisnis|business development)\b"),
    ("Operations", r"\b(operations?|operasional|logistik|logistics|supply chain)\b"),
    ("Design", r"\b(design|desain|designer|desainer|ui|ux|grafis|graphic)\b"),
    ("Engineering", r"\b(engineering|engineer|teknik|mesin|sipil|elektro)\b"),
    ("Healthcare", r"\b(healthcare|kesehatan|medis|perawat|dokter|farmasi)\b"),
    ("Education", r"\b(education|pendidikan|guru|teacher|tutor|pengajar)\b"),
];

/// City or region name followed by its aliases, most specific alias first.
const GAZETTEER: &[(&str, &[&str])] = &[
    ("Jakarta", &["dki jakarta", "jakarta", "jkt"]),
    ("Bandung", &["bandung"]),
    ("Surabaya", &["surabaya", "sby"]),
    ("Yogyakarta", &["yogyakarta", "jogjakarta", "jogja", "yogya", "diy"]),
    ("Semarang", &["semarang"]),
    ("Tangerang", &["tangerang selatan", "tangsel", "tangerang"]),
    ("Banten", &["banten"]),
    ("Bekasi", &["bekasi"]),
    ("Depok", &["depok"]),
    ("Bogor", &["bogor"]),
    ("Malang", &["malang"]),
    ("Medan", &["medan"]),
    ("Makassar", &["makassar"]),
    ("Bali", &["bali", "denpasar"]),
    ("Remote", &["remote", "wfh", "work from home", "kerja dari rumah", "online"]),
];

const EXPERIENCE_TAXONOMY: &[(&str, &str)] = &[
    ("Fresh Graduate", r"\b(fresh graduate|fresh grad|freshgrad|fresh gradute|lulusan baru)\b"),
    ("Student", r"\b(mahasiswa|student|pelajar|siswa)\b"),
    ("Entry Level", r"\b(entry level|junior|pemula|beginner)\b"),
    ("Mid Level", r"\b(mid level|middle|menengah|intermediate)\b"),
    ("Senior", r"\b(senior|expert|ahli|berpengalaman|advanced)\b"),
];

const WORK_TYPE_TAXONOMY: &[(&str, &str)] = &[
    ("Full Time", r"\b(full\s?time|penuh waktu)\b"),
    ("Part Time", r"\b(part\s?time|paruh waktu)\b"),
    ("Freelance", r"\b(freelance|freelancer|lepas)\b"),
    ("Contract", r"\b(kontrak|contract)\b"),
    ("Hybrid", r"\bhybrid\b"),
    ("On-site", r"\b(onsite|on site|wfo)\b"),
];

const STOP_WORDS: &[&str] = &[
    "yang", "untuk", "dengan", "dari", "dan", "atau", "ada", "apa", "apakah", "saya", "aku",
    "kamu", "mau", "ingin", "bisa", "tolong", "dong", "nih", "ini", "itu", "bidang", "tentang",
    "buat", "info", "informasi", "tersedia", "semua", "yg", "gak", "nggak", "tidak", "juga",
    "sebagai", "pada", "dalam", "akan", "sudah", "belum", "lagi", "kah", "deh", "sih", "ya",
    "please", "the", "and", "for", "with", "daerah", "kota", "sekitar", "terbaru", "baru",
    "bagus", "banyak", "beberapa", "dimana", "mana", "gimana", "bagaimana", "posisi",
];

const SEARCH_VERBS: &[&str] = &[
    "cari", "carikan", "mencari", "nyari", "temukan", "tampilkan", "lihat", "kasih", "berikan",
    "rekomendasi", "rekomendasikan", "butuh", "perlu", "tunjukkan", "search", "find", "show",
];

/// Words that only signal intent and never describe the domain being searched.
const INTENT_TERMS: &[&str] = &[
    "magang", "internship", "intern", "praktek", "praktik", "pkl", "kerja", "job", "jobs",
    "pekerjaan", "lowongan", "karir", "karier", "loker", "vacancy", "kursus", "course",
    "courses", "pelatihan", "training", "belajar", "bootcamp", "sertifikasi", "hai", "halo",
    "hallo", "hello", "hey", "selamat", "pagi", "siang", "sore", "malam", "kabar", "mulai",
    "program",
];

const MAX_FALLBACK_WORDS: usize = 3;

struct Taxon {
    name: &'static str,
    pattern: Regex,
}

fn compile_taxonomy(table: &[(&'static str, &str)]) -> Vec<Taxon> {
    table
        .iter()
        .map(|&(name, pattern)| Taxon {
            name,
            pattern: Regex::new(pattern).unwrap(),
        })
        .collect()
}

fn alias_pattern(alias: &str) -> Regex {
    Regex::new(&format!(r"\b{}\b", regex::escape(alias))).unwrap()
}

lazy_static! {
    static ref INTENTS: Vec<(IntentType, Vec<Regex>)> = INTENT_PATTERNS
        .iter()
        .map(|(intent, patterns)| {
            (*intent, patterns.iter().map(|p| Regex::new(p).unwrap()).collect())
        })
        .collect();
    static ref FIELDS: Vec<Taxon> = compile_taxonomy(FIELD_TAXONOMY);
    static ref EXPERIENCE: Vec<Taxon> = compile_taxonomy(EXPERIENCE_TAXONOMY);
    static ref WORK_TYPES: Vec<Taxon> = compile_taxonomy(WORK_TYPE_TAXONOMY);
    static ref LOCATIONS: Vec<(&'static str, Vec<Regex>)> = GAZETTEER
        .iter()
        .map(|(city, aliases)| (*city, aliases.iter().map(|a| alias_pattern(a)).collect()))
        .collect();
}

//=========================================================================================
// Extraction
//=========================================================================================

/// Extracts a `QueryDescriptor` from free text. Deterministic and infallible.
pub fn extract(text: &str) -> QueryDescriptor {
    let normalized = normalize(text);

    let intent = detect_intent(&normalized);
    let (locations, location_spans) = match_locations(&normalized);
    let (experience_level, experience_spans) = match_taxonomy(&EXPERIENCE, &normalized);
    let (work_type, work_type_spans) = match_taxonomy(&WORK_TYPES, &normalized);

    let (mut fields, _) = match_taxonomy(&FIELDS, &normalized);
    if fields.is_empty() {
        let claimed: Vec<&str> = location_spans
            .iter()
            .chain(&experience_spans)
            .chain(&work_type_spans)
            .flat_map(|span| span.split_whitespace())
            .collect();
        fields = fallback_words(&normalized, &claimed);
    }

    let confidence = confidence(intent, &fields, &locations);

    QueryDescriptor {
        intent,
        fields,
        locations,
        experience_level,
        work_type,
        confidence,
    }
}

/// Lowercases, replaces punctuation with spaces and collapses whitespace.
pub fn normalize(text: &str) -> String {
    let cleaned: String = text
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() || c.is_whitespace() { c } else { ' ' })
        .collect();
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn detect_intent(text: &str) -> IntentType {
    let mut best = IntentType::Unknown;
    let mut best_score = 0;
    for (intent, patterns) in INTENTS.iter() {
        let score: usize = patterns.iter().map(|p| p.find_iter(text).count()).sum();
        // Strictly greater, so ties keep the earlier declared category.
        if score > best_score {
            best = *intent;
            best_score = score;
        }
    }
    best
}

/// Returns matched taxonomy names ordered by where they first appear in the text,
/// plus the matched substrings.
fn match_taxonomy(taxonomy: &[Taxon], text: &str) -> (Vec<String>, Vec<String>) {
    let mut hits: Vec<(usize, &'static str, String)> = taxonomy
        .iter()
        .filter_map(|taxon| {
            taxon
                .pattern
                .find(text)
                .map(|m| (m.start(), taxon.name, m.as_str().to_string()))
        })
        .collect();
    hits.sort_by_key(|(start, _, _)| *start);

    let mut names: Vec<String> = Vec::new();
    let mut spans = Vec::new();
    for (_, name, span) in hits {
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
        spans.push(span);
    }
    (names, spans)
}

/// The first alias that matches claims its city; remaining aliases are not consulted.
fn match_locations(text: &str) -> (Vec<String>, Vec<String>) {
    let mut cities = Vec::new();
    let mut spans = Vec::new();
    for (city, aliases) in LOCATIONS.iter() {
        if let Some(m) = aliases.iter().find_map(|alias| alias.find(text)) {
            cities.push(city.to_string());
            spans.push(m.as_str().to_string());
        }
    }
    (cities, spans)
}

fn fallback_words(text: &str, claimed: &[&str]) -> Vec<String> {
    let mut words: Vec<String> = Vec::new();
    for word in text.split_whitespace() {
        if word.chars().count() <= 2
            || STOP_WORDS.contains(&word)
            || SEARCH_VERBS.contains(&word)
            || INTENT_TERMS.contains(&word)
            || claimed.contains(&word)
        {
            continue;
        }
        if !words.iter().any(|w| w == word) {
            words.push(word.to_string());
        }
        if words.len() == MAX_FALLBACK_WORDS {
            break;
        }
    }
    words
}

fn confidence(intent: IntentType, fields: &[String], locations: &[String]) -> f32 {
    let has_intent = intent != IntentType::Unknown;
    let mut score = 0.0_f32;
    if has_intent {
        score += 0.4;
    }
    if !fields.is_empty() {
        score += (fields.len() as f32 * 0.15).min(0.3);
    }
    if !locations.is_empty() {
        score += (locations.len() as f32 * 0.1).min(0.2);
    }
    if has_intent && !fields.is_empty() && !locations.is_empty() {
        score += 0.1;
    }
    score.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internship_request_with_field_and_city() {
        let descriptor = extract("Cari magang di bidang IT Jakarta");
        assert_eq!(descriptor.intent, IntentType::Internship);
        assert!(descriptor.fields.contains(&"IT".to_string()));
        assert!(descriptor.locations.contains(&"Jakarta".to_string()));
        assert!((descriptor.confidence - 0.75).abs() < 1e-6);
    }

    #[test]
    fn extraction_is_deterministic() {
        let inputs = [
            "Cari magang di bidang IT Jakarta",
            "lowongan kerja marketing remote full-time",
            "kursus blockchain",
            "halo!",
            "???",
        ];
        for input in inputs {
            assert_eq!(extract(input), extract(input), "input: {input}");
        }
    }

    #[test]
    fn tie_resolves_to_first_declared_intent() {
        // one internship hit and one job hit
        assert_eq!(extract("lowongan magang").intent, IntentType::Internship);
    }

    #[test]
    fn most_matches_wins() {
        let descriptor = extract("cari lowongan kerja full time di Bandung");
        assert_eq!(descriptor.intent, IntentType::Job);
        assert_eq!(descriptor.locations, vec!["Bandung".to_string()]);
        assert_eq!(descriptor.work_type, vec!["Full Time".to_string()]);
    }

    #[test]
    fn greeting_and_unknown() {
        assert_eq!(extract("Halo, apa kabar?").intent, IntentType::Greeting);
        let unknown = extract("blockchain web3 solidity");
        assert_eq!(unknown.intent, IntentType::Unknown);
        assert_eq!(unknown.fields, vec!["blockchain", "web3", "solidity"]);
    }

    #[test]
    fn empty_input_yields_empty_descriptor() {
        let descriptor = extract("   ");
        assert_eq!(descriptor.intent, IntentType::Unknown);
        assert!(descriptor.fields.is_empty());
        assert!(descriptor.locations.is_empty());
        assert_eq!(descriptor.confidence, 0.0);
    }

    #[test]
    fn fallback_skips_stop_words_verbs_and_intent_terms() {
        let descriptor = extract("tolong carikan kursus blockchain untuk pemula");
        assert_eq!(descriptor.intent, IntentType::Course);
        assert_eq!(descriptor.fields, vec!["blockchain".to_string()]);
        assert_eq!(descriptor.experience_level, vec!["Entry Level".to_string()]);
    }

    #[test]
    fn fields_keep_first_seen_order_without_duplicates() {
        let descriptor = extract("magang desain atau marketing, desain grafis juga");
        assert_eq!(descriptor.fields, vec!["Design".to_string(), "Marketing".to_string()]);
    }

    #[test]
    fn location_aliases_resolve_to_city() {
        let descriptor = extract("kerja wfh atau di jogja");
        assert_eq!(
            descriptor.locations,
            vec!["Yogyakarta".to_string(), "Remote".to_string()]
        );
    }

    #[test]
    fn confidence_stays_in_bounds() {
        let inputs = [
            "magang IT marketing finance design di jakarta bandung surabaya remote",
            "kerja",
            "",
            "halo",
            "pelatihan python dan data science untuk fresh graduate di bali",
        ];
        for input in inputs {
            let c = extract(input).confidence;
            assert!((0.0..=1.0).contains(&c), "confidence {c} for {input}");
        }
    }

    #[test]
    fn normalize_strips_punctuation() {
        assert_eq!(normalize("  Full-Time,   JAKARTA!! "), "full time jakarta");
    }
}
