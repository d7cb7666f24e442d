//! crates/career_assistant_core/src/prompt.rs
//!
//! Assembles the single text prompt sent to the completion API from the user's
//! request, the extracted query, the search results and the conversation so far.

use crate::domain::{Course, IntentType, Posting, QueryDescriptor, Record, SearchResults, UserContext};
use std::fmt::Write;

/// Records beyond this many are left out of the prompt.
pub const MAX_LISTED_RECORDS: usize = 6;
/// History turns rendered in the context block.
pub const CONTEXT_TURNS: usize = 4;
/// Each history turn is cut to this many characters.
pub const CONTEXT_TURN_CHARS: usize = 100;

const PERSONA: &str = r#"IDENTITAS: Kamu adalah CareerBot, asisten AI yang ramah dan membantu untuk mencari magang, pekerjaan, dan kursus.

KEPRIBADIAN:
- Ramah dan supportive
- Memberikan saran yang praktis
- Selalu optimis dan encouraging
- Responsif terhadap kebutuhan user
- Menggunakan bahasa yang natural dan tidak kaku

TUJUAN: Membantu user menemukan peluang karir yang sesuai dengan kebutuhan mereka."#;

const INSTRUCTIONS: &str = r#"INSTRUKSI RESPONS:
1. WAJIB menggunakan bahasa Indonesia yang ramah, natural, dan interaktif namun informal
2. Berikan rekomendasi dalam format yang mudah dibaca
3. Sertakan detail penting yang ada di DATA HASIL PENCARIAN
4. JANGAN mengarang informasi yang tidak ada di DATA HASIL PENCARIAN
5. Tambahkan tips atau insight yang berguna
6. PENTING: Akhiri dengan pertanyaan follow-up yang relevan untuk memicu interaksi
7. Gunakan emoji yang sesuai untuk membuat respons lebih menarik

CONTOH AKHIRAN INTERAKTIF:
- "Apakah ada bidang spesifik yang lebih kamu minati?"
- "Mau saya carikan info gaji untuk posisi ini?"
- "Butuh rekomendasi kursus untuk persiapan interview?"

FORMAT RESPONS:
- Gunakan bullet points untuk daftar dan font bold untuk judul
- Berikan ranking berdasarkan relevansi
- Sertakan call-to-action yang jelas"#;

const SCARCITY_INSTRUCTIONS: &str = r#"DATA TERBATAS: Jumlah data yang ditemukan lebih sedikit dari yang diminta.
Kamu WAJIB menyampaikan secara jelas bahwa data yang tersedia terbatas, misalnya:
- "Yah, data yang tersedia terbatas dan hanya itu yang sesuai"
- "Maaf ya, data yang dicari terbatas"
- "Saya bisa merekomendasikan pilihan lain jika tidak keberatan""#;

const AMBIGUITY_INSTRUCTIONS: &str = r#"PERMINTAAN AMBIGU: Jenis pencarian user tidak jelas, jadi hasil di atas berasal dari beberapa kategori.
- Akui bahwa pertanyaannya agak ambigu
- Tunjukkan hasil yang ditemukan per kategori
- Tanyakan klarifikasi apakah user mencari magang, pekerjaan, atau kursus"#;

const FIRST_CONVERSATION: &str = "Ini adalah percakapan pertama dengan user.";
const NO_DATA: &str = "Tidak ada data yang ditemukan.";
const NOT_AVAILABLE: &str = "N/A";

/// Builds the completion prompt. Pure and deterministic.
///
/// Missing or blank record fields are rendered as placeholders instead of failing.
pub fn build(
    user_input: &str,
    intent: IntentType,
    query: &QueryDescriptor,
    results: &SearchResults,
    context: &UserContext,
) -> String {
    let mut prompt = String::new();

    prompt.push_str(PERSONA);
    prompt.push_str("\n\nKONTEKS PERCAKAPAN:\n");
    prompt.push_str(&render_context(context));
    let _ = write!(prompt, "\n\nPERMINTAAN USER: \"{}\"", user_input.trim());
    let _ = write!(prompt, "\nINTENT: {}", intent.label());
    let _ = write!(prompt, "\nKEYWORDS: {}", render_query(query));
    prompt.push_str("\n\nDATA HASIL PENCARIAN:\n");
    prompt.push_str(&render_records(&results.records, intent == IntentType::Unknown));
    prompt.push_str("\n\n");
    prompt.push_str(INSTRUCTIONS);

    if intent == IntentType::Unknown {
        prompt.push_str("\n\n");
        prompt.push_str(AMBIGUITY_INSTRUCTIONS);
    }
    if results.is_scarce() {
        let _ = write!(
            prompt,
            "\n\n{}\n(Ditemukan {} dari {} data yang diminta.)",
            SCARCITY_INSTRUCTIONS,
            results.records.len(),
            results.requested
        );
    }

    prompt.push('\n');
    prompt
}

fn render_context(context: &UserContext) -> String {
    let mut lines: Vec<String> = Vec::new();

    let skip = context.history.len().saturating_sub(CONTEXT_TURNS);
    for turn in context.history.iter().skip(skip) {
        lines.push(format!(
            "{}: {}",
            turn.role.display_name(),
            clip(&turn.content, CONTEXT_TURN_CHARS)
        ));
    }

    if !context.preferences.is_empty() {
        let preferences = context
            .preferences
            .iter()
            .map(|(key, value)| format!("{}={}", key, value))
            .collect::<Vec<_>>()
            .join(", ");
        lines.push(format!("Preferensi user: {}", preferences));
    }

    if lines.is_empty() {
        FIRST_CONVERSATION.to_string()
    } else {
        lines.join("\n")
    }
}

fn render_query(query: &QueryDescriptor) -> String {
    let parts = [
        ("bidang", &query.fields),
        ("lokasi", &query.locations),
        ("pengalaman", &query.experience_level),
        ("tipe kerja", &query.work_type),
    ];
    let rendered: Vec<String> = parts
        .iter()
        .filter(|(_, values)| !values.is_empty())
        .map(|(name, values)| format!("{}: {}", name, values.join(", ")))
        .collect();

    if rendered.is_empty() {
        "-".to_string()
    } else {
        rendered.join("; ")
    }
}

fn render_records(records: &[Record], tag_category: bool) -> String {
    if records.is_empty() {
        return NO_DATA.to_string();
    }

    records
        .iter()
        .take(MAX_LISTED_RECORDS)
        .enumerate()
        .map(|(idx, record)| {
            let tag = if tag_category {
                format!("[{}] ", record.category().label())
            } else {
                String::new()
            };
            match record {
                Record::Course(course) => render_course(idx + 1, &tag, course),
                Record::Internship(posting) | Record::Job(posting) => {
                    render_posting(idx + 1, &tag, posting)
                }
            }
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn render_course(number: usize, tag: &str, course: &Course) -> String {
    let mut entry = format!(
        "{}. {}{}\n   Platform: {}\n   Durasi: {}\n   Modul: {}",
        number,
        tag,
        or_placeholder(Some(&course.title), "Judul tidak tersedia"),
        or_placeholder(Some(&course.source), NOT_AVAILABLE),
        or_placeholder(course.duration.as_ref(), NOT_AVAILABLE),
        or_placeholder(course.module_count.as_ref(), NOT_AVAILABLE),
    );
    if let Some(level) = course.level.as_deref().filter(|l| !l.trim().is_empty()) {
        let _ = write!(entry, "\n   Level: {}", level.trim());
    }
    entry
}

fn render_posting(number: usize, tag: &str, posting: &Posting) -> String {
    let mut entry = format!(
        "{}. {}{}\n   Perusahaan: {}\n   Lokasi: {}\n   Gaji: {}\n   Deadline: {}",
        number,
        tag,
        or_placeholder(Some(&posting.position), "Posisi tidak tersedia"),
        or_placeholder(Some(&posting.company), NOT_AVAILABLE),
        or_placeholder(posting.location.as_ref(), NOT_AVAILABLE),
        or_placeholder(posting.salary.as_ref(), "Tidak disebutkan"),
        or_placeholder(posting.deadline.as_ref(), NOT_AVAILABLE),
    );
    if let Some(job_type) = posting.job_type.as_deref().filter(|t| !t.trim().is_empty()) {
        let _ = write!(entry, "\n   Tipe: {}", job_type.trim());
    }
    entry
}

fn or_placeholder<'a>(value: Option<&'a String>, placeholder: &'a str) -> &'a str {
    match value.map(|v| v.trim()) {
        Some(v) if !v.is_empty() => v,
        _ => placeholder,
    }
}

/// Cuts `text` to `max_chars` characters, marking the cut with an ellipsis.
fn clip(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}...", &text[..byte_idx]),
        None => text.to_string(),
    }
}
