//! services/bot/src/bot/replies.rs
//!
//! Every fixed, user-facing text the bot can send.

use crate::bot::delivery::truncate_for_delivery;
use career_assistant_core::domain::Category;

pub const GREETING: &str = r#"👋 Halo! Saya CareerBot, asisten AI yang siap membantu kamu mencari:

🎯 Magang (Internship)
💼 Pekerjaan (Jobs)
📚 Kursus (Courses)

✨ Contoh yang bisa kamu tanyakan:
• "Cari magang di bidang IT"
• "Pekerjaan remote developer"
• "Kursus digital marketing"

Apa yang sedang kamu cari hari ini? 😊"#;

pub const UNKNOWN: &str = r#"🤔 Maaf, saya tidak yakin apa yang kamu maksud.

Saya bisa membantu kamu mencari:
• 🎯 Magang - ketik "cari magang [bidang]"
• 💼 Pekerjaan - ketik "cari kerja [posisi]"
• 📚 Kursus - ketik "cari kursus [topik]"

Atau ketik /help untuk panduan lengkap.

Coba tanyakan dengan cara yang lebih spesifik ya! 😊"#;

pub const REJECTED_INPUT: &str =
    "✏️ Maaf, saya hanya bisa membaca pesan teks dengan panjang maksimal {max} karakter. Coba kirim pertanyaan yang lebih singkat ya!";

pub const START: &str = r#"🤖 Halo! Selamat datang di Virtual Assistant Bot!

Saya asisten digital yang siap membantu Anda mencari informasi tentang:
🔹 Lowongan magang
🔹 Peluang pekerjaan
🔹 Rekomendasi kursus/keterampilan

📢 Penting untuk diketahui:
Saya masih dalam tahap pengembangan aktif dan terus belajar. Saat ini saya memiliki beberapa keterbatasan:
- Jawaban mungkin belum sempurna (terutama dalam Bahasa Indonesia)
- Belum bisa memahami semua jenis pertanyaan
- Kadang merespon dengan kurang akurat

💪 Tim developer saat ini sedang bekerja keras untuk meningkatkan kemampuan saya setiap hari!

💡 Tips: Gunakan kalimat sederhana dan kata kunci jelas untuk hasil terbaik."#;

pub const HELP: &str = r#"📌 Bantuan Penggunaan Bot

Perintah Tersedia:
/start - Untuk memulai bot
/help - Tampilkan menu bantuan
/info - Informasi teknis tentang bot

Contoh Custom Prompt:
"Tampilkan lowongan magang bidang TI di Bandung"
"Kursus tersedia untuk pemula di bidang keuangan""#;

/// `{model}` is replaced with the configured model identifier.
pub const INFO: &str = r#"ℹ️ Informasi Bot

🧠 Model bahasa: {model}
🗂️ Sumber data: hasil scraping lowongan magang, pekerjaan, dan kursus
🔎 Pencarian: kata kunci bidang dan lokasi dari pesanmu

Jawaban dibuat otomatis, jadi selalu cek kembali detail lowongan di situs aslinya ya!"#;

pub const HELP_HINT: &str = "Gunakan /help untuk bantuan dan /start untuk memulai kembali";

pub fn rejected_input(max_chars: usize) -> String {
    REJECTED_INPUT.replace("{max}", &max_chars.to_string())
}

pub fn info(model: &str) -> String {
    INFO.replace("{model}", model)
}

/// The message sent when a definite search came back empty.
pub fn empty_result(category: Category) -> String {
    let suggestions: &[&str] = match category {
        Category::Internship => &[
            "Coba gunakan kata kunci yang lebih umum seperti 'IT', 'Marketing', 'Finance'",
            "Periksa ejaan kata kunci yang digunakan",
            "Coba tanpa menyebutkan lokasi spesifik",
        ],
        Category::Job => &[
            "Gunakan kata kunci posisi yang lebih umum",
            "Coba cari berdasarkan industri seperti 'teknologi', 'perbankan'",
            "Periksa apakah lokasi yang dicari tersedia",
        ],
        Category::Course => &[
            "Coba kata kunci yang lebih spesifik seperti 'Python', 'Digital Marketing'",
            "Gunakan bahasa Indonesia atau Inggris",
            "Cari berdasarkan kategori seperti 'programming', 'design'",
        ],
    };
    let suggestions: Vec<String> = suggestions.iter().map(|s| format!("• {}", s)).collect();

    format!(
        r#"🔍 Maaf, tidak menemukan hasil untuk pencarian {}.

💡 Saran pencarian:
{}

🤔 Atau coba tanyakan:
- "Tampilkan semua magang di bidang IT"
- "Cari pekerjaan remote"
- "Kursus programming untuk pemula"

Mau coba dengan kata kunci yang berbeda? Saya siap membantu! 😊"#,
        category.label(),
        suggestions.join("\n")
    )
}

const PARTIAL_SEPARATOR: &str = "\n\n";

/// `partial` is whatever text was already shown to the user before the failure.
///
/// The result never exceeds `max_chars`: the partial text is shortened first so the
/// error message always survives delivery intact.
pub fn with_partial(partial: &str, error_message: &str, max_chars: usize) -> String {
    let partial = partial.trim_end();
    let reserved = error_message.chars().count() + PARTIAL_SEPARATOR.chars().count();
    let budget = max_chars.saturating_sub(reserved);
    if partial.is_empty() || budget == 0 {
        return error_message.to_string();
    }

    let partial = truncate_for_delivery(partial, budget);
    format!("{}{}{}", partial.trim_end(), PARTIAL_SEPARATOR, error_message)
}
