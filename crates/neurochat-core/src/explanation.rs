use neurochat_schema::{PredictionLabel, Turn};

use crate::session::SessionState;

const UPLOAD_HEADER: &str = "🧠 You uploaded an MRI image.";

/// Canned explanation shown after an upload.
pub fn explanation_for(label: &PredictionLabel) -> String {
    let body = match label {
        PredictionLabel::VeryMildDemented => Some(
            "This suggests the patient may be in the **early stage of Alzheimer's disease**, \
             often associated with **Mild Cognitive Impairment (MCI)**. Individuals at this stage \
             might have slight memory issues but generally maintain independence. A neurologist \
             should be consulted for a full diagnosis.",
        ),
        PredictionLabel::MildDemented => Some(
            "This indicates an **early stage of dementia**, where memory loss and confusion may \
             start to impact daily life. Medical evaluation is recommended to confirm and plan \
             further steps.",
        ),
        PredictionLabel::ModerateDemented => Some(
            "This reflects a **moderate stage of Alzheimer's disease**, often characterized by \
             noticeable confusion, increased memory loss, and need for assistance with routine \
             tasks. A comprehensive care plan may be needed.",
        ),
        PredictionLabel::NonDemented => Some(
            "This suggests no signs of dementia are visible in the MRI. However, if there are \
             symptoms, it’s best to consult a neurologist.",
        ),
        PredictionLabel::Other(_) => None,
    };

    let mut text = format!("{UPLOAD_HEADER}\n\n**Prediction:** `{label}`");
    if let Some(body) = body {
        text.push_str("\n\n");
        text.push_str(body);
    }
    text
}

/// Stores `label` and posts its explanation as a bot turn.
///
/// The explanation is skipped when the most recent bot turn already says
/// the same thing. Returns whether a turn was appended.
pub fn record_prediction(session: &mut SessionState, label: PredictionLabel) -> bool {
    let explanation = explanation_for(&label);
    session.set_prediction(label);

    let duplicate = session
        .transcript()
        .last_bot()
        .is_some_and(|turn| turn.content() == explanation);
    if duplicate {
        tracing::debug!(session_id = %session.id(), "explanation already posted, skipping");
        return false;
    }

    session.append(Turn::bot(explanation));
    true
}
