use inference_client::{Client, Message};

fn main() -> Result<(), inference_client::Error> {
    let client = Client::from_environment()?;

    // Build the conversation in turn order
    let conversation = [
        Message::system("Answer in one sentence."),
        Message::user("Who are you?"),
    ];

    // Send the request and keep the first choice
    let reply = client.complete(&conversation)?;

    println!("{reply}");

    Ok(())
}
