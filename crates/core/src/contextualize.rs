use crate::error::ModelError;
use crate::models::{ChatTurn, Chunk};
use crate::traits::ChatModel;

/// Asks the model for a short summary situating `chunk_text` within the
/// full page it was cut from. One synchronous model call per chunk; the
/// caller decides what a failure aborts.
pub async fn situate_chunk<M: ChatModel>(
    model: &M,
    page_text: &str,
    chunk_text: &str,
) -> Result<String, ModelError> {
    let prompt = situating_prompt(page_text, chunk_text);
    let summary = model.complete(&[ChatTurn::user(prompt)]).await?;
    Ok(summary.trim().to_string())
}

/// Prepends the situating summary to the chunk's raw text, forming the
/// combined content used for retrieval and answering.
pub fn apply_context(chunk: &mut Chunk, summary: String) {
    chunk.context = Some(summary);
}

fn situating_prompt(page_text: &str, chunk_text: &str) -> String {
    format!(
        "You are an assistant for document analysis tasks. Please give a short succinct \
         context to situate this chunk within the overall document for the purposes of \
         improving search retrieval of the chunk.\n\
         Answer only with the succinct context and nothing else. Here is the chunk we want \
         to situate within the whole document.\n\
         <chunk>\n{chunk_text}\n</chunk>\n\n\
         Here is the document:\n\
         <document>\n{page_text}\n</document>"
    )
}
