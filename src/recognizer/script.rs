//! Parsing bundle text with swc

use swc_core::common::sync::Lrc;
use swc_core::common::{FileName, SourceMap, Span, Spanned};
use swc_core::ecma::ast::{EsVersion, Script};
use swc_core::ecma::parser::lexer::Lexer;
use swc_core::ecma::parser::{Parser, StringInput, Syntax};
use tracing::debug;

use super::ByteRange;

/// Source text the parser rejected
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message} at {range}")]
pub struct ParseError {
    pub message: String,
    pub range: ByteRange,
}

/// Converts swc spans into byte ranges of the caller's text
#[derive(Debug, Clone, Copy)]
pub(crate) struct SpanMap {
    /// Position swc assigned to the first byte of the parsed text
    base: u32,
    /// Offset of the parsed text inside the caller's text
    offset: usize,
}

impl SpanMap {
    pub(crate) fn range(&self, span: Span) -> ByteRange {
        ByteRange::new(self.position(span.lo.0), self.position(span.hi.0))
    }

    fn position(&self, pos: u32) -> usize {
        pos.saturating_sub(self.base) as usize + self.offset
    }
}

#[derive(Debug)]
pub(crate) struct ParsedScript {
    pub script: Script,
    pub spans: SpanMap,
}

/// Parse `source` as a classic script whose first byte sits at `offset`
pub(crate) fn parse_script(source: &str, offset: usize) -> Result<ParsedScript, ParseError> {
    let cm: Lrc<SourceMap> = Default::default();
    let fm = cm.new_source_file(FileName::Anon.into(), source.into());
    let spans = SpanMap {
        base: fm.start_pos.0,
        offset,
    };

    let lexer = Lexer::new(
        Syntax::Es(Default::default()),
        EsVersion::EsNext,
        StringInput::from(&*fm),
        None,
    );
    let mut parser = Parser::new_from(lexer);
    let script = parser.parse_script().map_err(|err| ParseError {
        message: err.kind().msg().into_owned(),
        range: spans.range(err.span()),
    })?;

    for err in parser.take_errors() {
        debug!("Recovered from {} at {}", err.kind().msg(), spans.range(err.span()));
    }

    Ok(ParsedScript { script, spans })
}
