/// Grounded-generation prompt: the model may only use `context`, must say so
/// when the context is insufficient, and answers in `language`.
pub fn build_prompt(context: &str, question: &str, language: &str) -> String {
    format!(
        "You are an expert assistant that answers questions based on the provided document.\n\
         Use the following context to answer the user's question.\n\
         If you cannot find the answer in the context, say clearly that the document does not contain enough information.\n\
         Always answer in {language}, clearly, precisely and concisely.\n\
         \n\
         Context:\n\
         {context}\n\
         \n\
         Question: {question}\n\
         \n\
         Answer:"
    )
}
