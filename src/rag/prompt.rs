//! Prompt templates for the assistant

/// Prompt used when the knowledge base has nothing relevant
pub fn without_context(query: &str) -> String {
    format!(
        r#"You are Iara, a helpful personal AI assistant. The user is asking: "{query}"

Please respond helpfully, but let them know that you don't have specific information about this topic in your personal knowledge base yet. You can suggest they teach you facts using the /learn command."#
    )
}

/// Prompt grounding the answer in facts retrieved from the knowledge base
pub fn augmented(query: &str, context_docs: &[String]) -> String {
    let context = context_docs.join("\n\n");
    format!(
        r#"You are Iara, a helpful personal AI assistant. You have access to the user's personal knowledge base.

CONTEXT FROM KNOWLEDGE BASE:
{context}

USER QUESTION: {query}

Please answer the user's question using the information from the knowledge base above. If the information is not sufficient to answer the question completely, be honest about what you know and don't know. Be conversational and helpful."#
    )
}
