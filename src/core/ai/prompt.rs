//! Prompt templates for article drafting.
//!
//! The articles are written in Spanish and must come back as plain text: the
//! output is uploaded as-is into a word-processor document, so any markdown
//! would show up literally.

/// Frames the model as a writer producing a document, not a chat answer.
pub const ARTICLE_SYSTEM_PROMPT: &str = "Eres un escritor experto que genera artículos en \
formato de documento Word, sin usar markdown ni caracteres especiales de formateo.";

/// Builds the instruction for one article.
pub fn article_prompt(topic: &str, audience: &str) -> String {
    format!(
        "Escribe un artículo detallado sobre {topic} para {audience}.\n\
         \n\
         Instrucciones de formato:\n\
         - No uses formato markdown\n\
         - No uses símbolos especiales como #, *, - para formateo\n\
         - Usa párrafos separados por líneas en blanco\n\
         - Para los títulos, simplemente escríbelos en una línea separada\n\
         - El artículo debe tener:\n  \
           1. Un título principal\n  \
           2. Una introducción\n  \
           3. Desarrollo del contenido con subtítulos descriptivos\n  \
           4. Una conclusión\n\
         \n\
         El artículo debe ser informativo, bien estructurado y con un tono apropiado para la audiencia."
    )
}
