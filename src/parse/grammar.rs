use winnow::ascii::multispace0;
use winnow::combinator::{delimited, terminated};
use winnow::prelude::*;
use winnow::token::{rest, take_till};

/// `<token>` at the end of a recipient string, trailing whitespace allowed.
pub(super) fn angle_token<'i>(input: &mut &'i str) -> ModalResult<&'i str> {
    terminated(delimited('<', take_till(1.., '>'), '>'), multispace0).parse_next(input)
}

/// `local@domain` with both sides non-empty.
pub(super) fn mailbox<'i>(input: &mut &'i str) -> ModalResult<&'i str> {
    (take_till(1.., '@'), '@', rest.verify(|domain: &str| !domain.is_empty()))
        .take()
        .parse_next(input)
}
