//! Note composer — deterministically assembles the Markdown body.
//!
//! Section order: media embeds, transcript, message text (caption as
//! fallback), trailing links for non-embeddable attachments. Present
//! sections are joined by exactly one horizontal-rule delimiter; absent
//! sections contribute nothing.

use crate::pipeline::types::{StagedAttachment, Transcript};

/// Fixed heading above the transcript section.
pub const TRANSCRIPT_HEADING: &str = "**Transcribed audio:**";

/// Delimiter between adjacent sections.
const SECTION_DELIMITER: &str = "\n\n---\n\n";

/// The assembled note body plus the attachments it references.
///
/// Invariant: every `/data/...` reference in the body corresponds to
/// exactly one entry in `attachments`; non-embeddable attachments appear
/// as trailing links so nothing is left orphaned.
#[derive(Debug, Clone)]
pub struct NoteDocument {
    pub body: String,
    pub attachments: Vec<StagedAttachment>,
}

impl NoteDocument {
    /// Compose the note body. Reproducible: identical inputs yield an
    /// identical body.
    pub fn compose(
        text: Option<&str>,
        caption: Option<&str>,
        attachments: Vec<StagedAttachment>,
        transcript: Option<Transcript>,
    ) -> Self {
        let mut sections: Vec<String> = Vec::new();

        let embeds: Vec<String> = attachments
            .iter()
            .filter(|a| a.kind.is_embeddable())
            .map(|a| format!("![](/data/{})", a.rel_path))
            .collect();
        if !embeds.is_empty() {
            sections.push(embeds.join("\n"));
        }

        if let Some(t) = transcript {
            sections.push(format!("{TRANSCRIPT_HEADING}\n\n{}", t.text));
        }

        // Primary text wins; caption is a fallback only when text is empty.
        let primary = non_empty(text).or_else(|| non_empty(caption));
        if let Some(p) = primary {
            sections.push(p.to_string());
        }

        let links: Vec<String> = attachments
            .iter()
            .filter(|a| !a.kind.is_embeddable())
            .map(|a| format!("[{}](/data/{})", a.display_name(), a.rel_path))
            .collect();
        if !links.is_empty() {
            sections.push(links.join("\n"));
        }

        Self {
            body: sections.join(SECTION_DELIMITER),
            attachments,
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::types::MediaKind;

    fn staged(rel_path: &str, kind: MediaKind) -> StagedAttachment {
        StagedAttachment {
            rel_path: rel_path.into(),
            bytes: vec![1, 2, 3],
            kind,
            file_name: None,
            mime: None,
        }
    }

    #[test]
    fn plain_text_is_passed_through_verbatim() {
        let doc = NoteDocument::compose(Some("hello"), None, vec![], None);
        assert_eq!(doc.body, "hello");
    }

    #[test]
    fn photo_and_transcript_layout() {
        let doc = NoteDocument::compose(
            Some(""),
            None,
            vec![staged("abc.jpg", MediaKind::Photo)],
            Some(Transcript {
                text: "hi there".into(),
            }),
        );
        assert_eq!(
            doc.body,
            "![](/data/abc.jpg)\n\n---\n\n**Transcribed audio:**\n\nhi there"
        );
    }

    #[test]
    fn caption_is_fallback_only() {
        let doc = NoteDocument::compose(Some("primary"), Some("caption"), vec![], None);
        assert_eq!(doc.body, "primary");

        let doc = NoteDocument::compose(None, Some("caption"), vec![], None);
        assert_eq!(doc.body, "caption");

        let doc = NoteDocument::compose(Some("   "), Some("caption"), vec![], None);
        assert_eq!(doc.body, "caption");
    }

    #[test]
    fn documents_become_trailing_links() {
        let mut att = staged("f1.pdf", MediaKind::Document);
        att.file_name = Some("report.pdf".into());
        let doc = NoteDocument::compose(Some("see attached"), None, vec![att], None);
        assert_eq!(doc.body, "see attached\n\n---\n\n[report.pdf](/data/f1.pdf)");
    }

    #[test]
    fn audio_without_transcript_is_linked_not_embedded() {
        let doc = NoteDocument::compose(
            None,
            None,
            vec![staged("v1.ogg", MediaKind::Voice)],
            None,
        );
        assert_eq!(doc.body, "[v1.ogg](/data/v1.ogg)");
        assert!(!doc.body.contains(TRANSCRIPT_HEADING));
    }

    #[test]
    fn everything_absent_yields_empty_body() {
        let doc = NoteDocument::compose(None, None, vec![], None);
        assert_eq!(doc.body, "");
    }

    #[test]
    fn full_message_section_order() {
        let doc = NoteDocument::compose(
            Some("note text"),
            None,
            vec![
                staged("p.jpg", MediaKind::Photo),
                staged("m.mp4", MediaKind::Video),
                staged("v.ogg", MediaKind::Voice),
                staged("d.pdf", MediaKind::Document),
            ],
            Some(Transcript {
                text: "spoken words".into(),
            }),
        );
        assert_eq!(
            doc.body,
            "![](/data/p.jpg)\n![](/data/m.mp4)\
             \n\n---\n\n\
             **Transcribed audio:**\n\nspoken words\
             \n\n---\n\n\
             note text\
             \n\n---\n\n\
             [v.ogg](/data/v.ogg)\n[d.pdf](/data/d.pdf)"
        );
    }

    #[test]
    fn every_body_reference_maps_to_an_attachment() {
        let doc = NoteDocument::compose(
            Some("txt"),
            None,
            vec![
                staged("a.jpg", MediaKind::Photo),
                staged("b.pdf", MediaKind::Document),
            ],
            None,
        );
        for a in &doc.attachments {
            assert!(doc.body.contains(&format!("/data/{}", a.rel_path)));
        }
        // And no references to anything else.
        let refs = doc.body.matches("/data/").count();
        assert_eq!(refs, doc.attachments.len());
    }
}
