use console::{style, Emoji, Term};
use neurochat_provider::ModelInfo;
use neurochat_schema::{Role, Transcript, Turn};

pub static BRAIN: Emoji<'_, '_> = Emoji("🧠 ", "");
pub static USER: Emoji<'_, '_> = Emoji("🧑‍💬 ", "");
pub static BOT: Emoji<'_, '_> = Emoji("🤖 ", "");
pub static CHECKMARK: Emoji<'_, '_> = Emoji("✅ ", "√ ");

pub fn print_banner(term: &Term, app_name: &str) {
    let _ = term.write_line(&format!(
        "{}{}",
        BRAIN,
        style(format!("{app_name} chat")).bold().cyan()
    ));
    let _ = term.write_line(&format!(
        "{}",
        style("Commands: /upload <path>, /history, /reset, quit").dim()
    ));
    let _ = term.write_line("---");
}

pub fn print_done(term: &Term, msg: &str) {
    let _ = term.write_line(&format!("{} {}", CHECKMARK, style(msg).green()));
}

pub fn print_error(term: &Term, msg: &str) {
    let _ = term.write_line(&format!("{}", style(msg).red()));
}

pub fn format_turn(turn: &Turn) -> String {
    match turn.role() {
        Role::User => format!("{}{} {}", USER, style("You:").bold(), turn.content()),
        Role::Bot => format!("{}{} {}", BOT, style("Bot:").bold().cyan(), turn.content()),
    }
}

pub fn print_turn(term: &Term, turn: &Turn) {
    let _ = term.write_line(&format_turn(turn));
}

pub fn print_history(term: &Term, transcript: &Transcript) {
    let _ = term.write_line(&format!("{}", style("💬 Chat History").bold()));
    let _ = term.write_line(&transcript.render());
}

/// `name - method, method` as printed by `neurochat models`.
pub fn format_model_line(model: &ModelInfo) -> String {
    format!(
        "{} - {}",
        model.name,
        model.supported_generation_methods.join(", ")
    )
}
