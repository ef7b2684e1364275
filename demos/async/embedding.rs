use inference_client::Client;

#[tokio::main]
async fn main() -> Result<(), inference_client::Error> {
    let client = Client::from_environment()?;

    let query = client.embed("Can I keep a pet?").await?;
    let answer = client
        .embed("Pets are not allowed in this building.")
        .await?;

    println!("dimension: {}", query.dimension());
    println!("similarity: {:?}", query.cosine_similarity(&answer));

    Ok(())
}
