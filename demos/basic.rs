use sendcheck::{Attachment, Configs, Confirm, PolicyDecision, Prompt};

const SETTINGS: &str = r#"{
    "internalDomains": ["example.com"],
    "attentionDomains": ["partner.example"],
    "baseRules": [
        { "id": "partners", "name": "Partners", "highlight": "always",
          "action": "reconfirm-always", "confirmMessage": "Send to partners?\n%s",
          "itemsLocal": ["partner.example"] },
        { "id": "archives", "matchTarget": "attachment-suffix",
          "action": "reconfirm-only-externals", "confirmMessage": "Archives attached:\n%s",
          "itemsLocal": ["zip", "7z"] }
    ],
    "minConfirmationRecipientsCount": 0
}"#;

/// Prints every prompt and confirms it.
struct Console;

impl Confirm for Console {
    type Error = std::convert::Infallible;

    async fn confirm(&mut self, prompt: &Prompt<'_>) -> Result<bool, Self::Error> {
        println!("[{}] {}", prompt.rule.id, prompt.message);
        Ok(true)
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let configs = Configs::from_json(SETTINGS).expect("failed to parse settings");
    let mut rules = configs.matching_rules();
    rules.populate(&sendcheck::NoFiles).await;

    println!("{rules}");

    let recipients = configs.recipient_classifier().classify(&[
        "Me <me@example.com>",
        "Partner <someone@partner.example>",
    ]);
    let attachments = vec![Attachment::new("report.zip")];
    let message = recipients
        .message()
        .attachments(&attachments)
        .subject("Quarterly report");

    println!(
        "Highlighted recipients: {:?}",
        rules.get_highlighted_recipient_addresses(&message)
    );

    match configs.send_policy().decide(&recipients) {
        PolicyDecision::Skip(reason) => println!("Skipping confirmation: {reason}"),
        PolicyDecision::Confirm { external_domains } => {
            println!("External domains: {external_domains:?}");
            let confirmed = rules.try_reconfirm(&message, &mut Console).await;
            println!("Send confirmed: {confirmed}");
        }
    }
}
