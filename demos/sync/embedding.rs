use inference_client::Client;

fn main() -> Result<(), inference_client::Error> {
    let client = Client::from_environment()?;

    let query = client.embed("Can I keep a pet?")?;
    let answer = client.embed("Pets are not allowed in this building.")?;

    println!("dimension: {}", query.dimension());
    println!("similarity: {:?}", query.cosine_similarity(&answer));

    Ok(())
}
