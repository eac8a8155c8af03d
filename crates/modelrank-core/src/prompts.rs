//! Built-in prompt templates.
//!
//! Both templates use `{name}` placeholders interpolated by
//! [`crate::template`]. Tasks and run files may replace either one.

/// Template for retrieval-augmented generation.
///
/// Placeholders: `{context}`, `{question}`.
pub const DEFAULT_AUGMENTED_TEMPLATE: &str = r#"
Answer the "User question" concisely and accurately, based only on the
"Reference documents" below.
If the reference documents do not contain the information, say so honestly.

---
Reference documents:
{context}
---
User question: {question}
"#;

/// Template given to the evaluator model.
///
/// Placeholders: `{question}`, `{answer}`, `{latency:.2f}`.
/// The evaluator must reply with `<SCORE>` and `<SUMMARY>` markers, which
/// [`crate::evaluation::parse_evaluation_output`] extracts.
pub const DEFAULT_EVALUATION_TEMPLATE: &str = r#"
Read the "Model answer" to the "User question" below and evaluate its
**accuracy, completeness and clarity**.
Also take into account the time it took to generate the answer
({latency:.2f} seconds), and give a **final score from 1 to 100**.

* **High score**: accurate and clear answer, generated quickly (e.g. under 3 seconds).
* **Low score**: inaccurate or unclear information, or an extremely slow answer (e.g. 30 seconds or more).

Output the score only, in the form **<SCORE>X</SCORE>**. Then, right after the
score, write an **overall review** of the answer in the form
**<SUMMARY>review text</SUMMARY>**. Do not output any text other than the
score and the review.

---
User question: {question}
---
Model answer: {answer}
---
Generation time: {latency:.2f} seconds
"#;
