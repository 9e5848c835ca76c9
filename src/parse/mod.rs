mod grammar;

use winnow::Parser;

use crate::ClassifiedRecipient;

/// Split a free-form recipient into address and lower-cased domain.
///
/// `Name <local@domain>` yields the bracketed address; anything else is taken
/// as the address itself. `Name <Name>` (optionally `"Name" <Name>`) is how
/// mailing lists are displayed and yields an empty address and domain, so it
/// never matches a domain rule. A bracket token containing `@` is always an
/// address, so `a@b.com <a@b.com>` yields domain `b.com`. Never fails: input
/// without `@` simply has an empty domain.
///
/// # Example
///
/// ```
/// use sendcheck::parse::parse_recipient;
///
/// let parsed = parse_recipient("Alice <alice@Example.COM>");
/// assert_eq!(parsed.address, "alice@Example.COM");
/// assert_eq!(parsed.domain, "example.com");
/// ```
#[must_use]
pub fn parse_recipient(recipient: &str) -> ClassifiedRecipient {
    let address = match recipient.rfind('<') {
        Some(at) => {
            let (name, tail) = recipient.split_at(at);
            match grammar::angle_token.parse(tail) {
                Ok(token) if is_list_display(name, token) => {
                    return ClassifiedRecipient {
                        recipient: recipient.to_owned(),
                        ..ClassifiedRecipient::default()
                    };
                }
                Ok(token) if grammar::mailbox.parse(token).is_ok() => token,
                _ => recipient,
            }
        }
        None => recipient,
    };
    let domain = address
        .split_once('@')
        .map(|(_, domain)| domain.to_lowercase())
        .unwrap_or_default();
    ClassifiedRecipient {
        recipient: recipient.to_owned(),
        address: address.to_owned(),
        domain,
        is_attention_domain: false,
    }
}

fn is_list_display(name: &str, token: &str) -> bool {
    let name = name.trim();
    let token = token.trim();
    if name.is_empty() || token.contains('@') {
        return false;
    }
    let unquoted = name
        .strip_prefix('"')
        .and_then(|n| n.strip_suffix('"'))
        .unwrap_or(name);
    name == token || unquoted == token
}

/// Split the contents of an items file into its entries.
///
/// Entries are separated by any run of whitespace, `,`, `|` or `;`. Empty
/// entries are dropped, so blank contents yield no items.
#[must_use]
pub fn parse_items(contents: &str) -> Vec<String> {
    contents
        .split(is_separator)
        .filter(|item| !item.is_empty())
        .map(str::to_owned)
        .collect()
}

fn is_separator(c: char) -> bool {
    c.is_whitespace() || matches!(c, ',' | '|' | ';')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn items_split_on_every_separator() {
        assert_eq!(
            parse_items("\n a.com, b.com|c.com;d.com\r\n\te.com  "),
            ["a.com", "b.com", "c.com", "d.com", "e.com"]
        );
        assert!(parse_items("").is_empty());
        assert!(parse_items(" ,|; \n").is_empty());
    }
}
