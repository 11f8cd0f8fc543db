use super::SyntaxExtension;
use crate::arena::NodeId;
use crate::error::Result;
use crate::nodes::{ExtensionNode, ExtensionPayload, NodeKind};
use crate::options::{OptionFlags, Options};
use crate::render::RenderContext;

pub const STRIKETHROUGH: NodeKind = NodeKind("strikethrough");

/// `~text~` and `~~text~~`, resolved on the emphasis delimiter stack. Runs of
/// three or more tildes stay literal, and an opener only pairs with a closer
/// of the same length.
#[derive(Debug, Default, Clone, Copy)]
pub struct Strikethrough;

impl SyntaxExtension for Strikethrough {
    fn name(&self) -> &'static str {
        "strikethrough"
    }

    fn node_kinds(&self) -> &'static [NodeKind] {
        &[STRIKETHROUGH]
    }

    fn delimiter_char(&self) -> Option<u8> {
        Some(b'~')
    }

    fn accepts_delimiter_run(&self, len: usize, options: &Options) -> bool {
        match len {
            1 => !options.has(OptionFlags::STRIKETHROUGH_DOUBLE_TILDE),
            2 => true,
            _ => false,
        }
    }

    fn match_delimiters(&self, opener_len: usize, closer_len: usize) -> Option<(usize, ExtensionNode)> {
        (opener_len == closer_len)
            .then(|| (opener_len, ExtensionNode::new(STRIKETHROUGH, ExtensionPayload::None)))
    }

    fn render_html(&self, ctx: &mut RenderContext<'_>, _node: NodeId, entering: bool) -> Result<()> {
        ctx.write_str(if entering { "<del>" } else { "</del>" });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markdown_to_html;

    fn strike(input: &str, options: Options) -> String {
        markdown_to_html(input, &options.with_extension("strikethrough")).unwrap()
    }

    #[test]
    fn single_and_double_tildes() {
        assert_eq!(
            strike("~~Hi~~ Hello, ~there~ world!", Options::default()),
            "<p><del>Hi</del> Hello, <del>there</del> world!</p>\n"
        );
    }

    #[test]
    fn mismatched_and_long_runs_stay_literal() {
        assert_eq!(strike("~~a~ b", Options::default()), "<p>~~a~ b</p>\n");
        assert_eq!(
            strike("This ~~~~will not~~~~ strike.", Options::default()),
            "<p>This ~~~~will not~~~~ strike.</p>\n"
        );
    }

    #[test]
    fn double_tilde_option_rejects_single_runs() {
        let opts = Options::default().with_flag(OptionFlags::STRIKETHROUGH_DOUBLE_TILDE);
        assert_eq!(strike("~a~ ~~b~~", opts), "<p>~a~ <del>b</del></p>\n");
    }

    #[test]
    fn nests_with_emphasis() {
        assert_eq!(
            strike("*~~x~~*", Options::default()),
            "<p><em><del>x</del></em></p>\n"
        );
    }
}
