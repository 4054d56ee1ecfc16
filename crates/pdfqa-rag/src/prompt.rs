use pdfqa_core::types::RetrievedChunk;

const PREAMBLE: &str = "Use the following pieces of context to answer the question at the end. \
If you don't know the answer, just say that you don't know, don't try to make up an answer.";

/// "Stuff" prompt: every retrieved chunk, best match first, then the question.
pub fn build_prompt(question: &str, hits: &[RetrievedChunk]) -> String {
    let context = hits.iter().map(|h| h.chunk.text.as_str()).collect::<Vec<_>>().join("\n\n");
    format!("{PREAMBLE}\n\n{context}\n\nQuestion: {question}\nHelpful Answer:")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdfqa_core::types::IndexedChunk;

    fn hit(text: &str, score: f32) -> RetrievedChunk {
        RetrievedChunk { chunk: IndexedChunk { doc_id: "d.pdf".into(), chunk_index: 0, text: text.into() }, score }
    }

    #[test]
    fn context_keeps_relevance_order() {
        let prompt = build_prompt("What color is the sky?", &[hit("The sky is blue.", 0.9), hit("Grass is green.", 0.2)]);
        let sky = prompt.find("The sky is blue.").expect("first chunk");
        let grass = prompt.find("Grass is green.").expect("second chunk");
        assert!(sky < grass);
        assert!(prompt.ends_with("Question: What color is the sky?\nHelpful Answer:"));
        assert!(prompt.contains("The sky is blue.\n\nGrass is green."));
    }
}
