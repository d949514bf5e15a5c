use crate::traits::Prompt;
use crate::types::{Category, MarkerPreference, SuggestionRequest};

/// Build the system and user instructions for one request.
pub fn build_prompt(request: &SuggestionRequest, preference: MarkerPreference) -> Prompt {
    let count = request.count();
    let category = request.category();

    let system = format!(
        "You are a helpful assistant that suggests {plural} for a guessing game based on user prompts.\n\
         {fields}\n\n\
         Return the information in this exact JSON format:\n\
         {schema}\n\n\
         Return exactly {count} {plural}. Make sure the JSON is valid.",
        plural = category.plural(),
        fields = field_instructions(category, preference),
        schema = schema_example(category),
        count = count,
    );

    let mut user = format!(
        "Suggest {} {} related to: {}",
        count,
        category.plural(),
        request.theme()
    );
    if !request.exclude().is_empty() {
        let avoid: Vec<String> = request.exclude().iter().map(ToString::to_string).collect();
        user.push_str(&format!(". Please avoid these {}: {}", category.plural(), avoid.join(", ")));
    }

    Prompt { system, user }
}

fn field_instructions(category: Category, preference: MarkerPreference) -> String {
    match category {
        Category::Song => {
            let link = match preference {
                MarkerPreference::PreferOriginal => "A YouTube link to the official audio or video",
                MarkerPreference::PreferKaraoke => "A YouTube link to a karaoke version",
            };
            format!(
                "For each suggestion, provide:\n\
                 1. The song title\n\
                 2. The movie/show/game it's from (if applicable)\n\
                 3. The artist/band name\n\
                 4. {}",
                link
            )
        }
        Category::Quote => "For each suggestion, provide:\n\
             1. The exact quote\n\
             2. The movie/show/book it's from\n\
             3. The character or person who said it\n\
             4. The year it was released"
            .to_string(),
        Category::MovieScene => "For each suggestion, provide:\n\
             1. A short title for the scene\n\
             2. The movie it's from\n\
             3. The main character in the scene\n\
             4. The release year and genre\n\
             5. A one-sentence description of the scene\n\
             6. The same description with every character, actor and place name replaced \
             by generic placeholders such as \"a young man\" or \"a distant planet\""
            .to_string(),
    }
}

fn schema_example(category: Category) -> &'static str {
    match category {
        Category::Song => {
            r#"[
    {
        "title": "Song Title",
        "source": "Movie/Show/Game Name",
        "artist": "Artist/Band Name",
        "link": "url link"
    }
]"#
        }
        Category::Quote => {
            r#"[
    {
        "quote": "Quote text",
        "source": "Movie/Show/Book Name",
        "speaker": "Character Name",
        "year": "1999"
    }
]"#
        }
        Category::MovieScene => {
            r#"[
    {
        "title": "Scene Title",
        "movie": "Movie Name",
        "character": "Character Name",
        "year": "1999",
        "genre": "Genre",
        "description": "What happens, with real names",
        "anonymized_description": "What happens, with names replaced"
    }
]"#
        }
    }
}
