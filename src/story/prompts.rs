//! Prompt templates sent to the chat model.
//!
//! Replies are expected in a labelled layout (`الفقرة:` paragraph, `الخيارات:`
//! numbered options, `العنوان:` title) which `story::parser` understands.

use crate::models::{Character, StoryConfig, StoryLength, StoryType};

const OPTION_FORMAT_EXAMPLE: &str =
    "Format: \"[Character name] + verb\", like: \"أحمد يتصل بالشرطة\", \"سارة تهرب من المكان\".";

const OPTIONS_LAYOUT: &str = "
    الخيارات:
    1. [Character name + action verb in Arabic, 3-5 words total]
    2. [Character name + different action verb in Arabic, 3-5 words total]
    3. [Character name + another different action verb in Arabic, 3-5 words total]
    ";

pub fn system_prompt() -> &'static str {
    r#"
    You are a professional and creative Arabic story writer. Your task is to write original, engaging, and cohesive Arabic stories.

    Adhere to the following standards in all the stories you write:

    1. Use correct and understandable classical Arabic language, free from grammatical and spelling errors.
    2. Build a coherent and logical story that follows good dramatic structure principles (beginning, rising action, climax, resolution).
    3. Adhere to Arabic and Islamic values and ethics in the story content.
    4. Avoid inappropriate content or anything that violates public taste or religious values.
    5. Provide detailed sensory descriptions of characters, places, and events to make the story vivid and engaging.
    6. Make dialogue realistic and natural, appropriate to the story's characters and environment.
    7. Maintain consistency in character traits and behaviors throughout the story.
    8. Include positive values and useful lessons in an indirect way.
    9. Use diverse narrative techniques: description, dialogue, narration, internal monologue.
    10. Create a clear conflict that drives the story events and maintains reader interest.

    Each time you are asked to write a new paragraph of the story, you must:
    - Write a coherent and engaging narrative paragraph of 4-6 lines in Arabic.
    - Provide 3 distinctive and interesting options to develop the story's path.

    Important rules for options:
    1. Make options very practical and short (3-5 words only) in Arabic.
    2. ALWAYS start each option with the character's name followed by the action verb.
    3. Use clear format: "[Character name] + verb", for example: "أحمد يتصل بالشرطة" (Ahmed calls the police), "سارة تهرب من المكان" (Sarah escapes from the place).
    4. Make it absolutely clear WHO is performing the action in each option.
    5. Don't explain what will happen after the choice, just mention the direct action.
    6. Ensure each option will lead to a completely different path in the story.
    7. Make options logical and appropriate to the current situation in the story.

    Result of user choice:
    1. Do not summarize the user's chosen option at the beginning of the next paragraph.
    2. Start directly with the reactions and consequences resulting from the user's choice.
    3. Present surprising and unexpected developments resulting from the choice.
    4. Maintain story consistency despite the change in path.

    When the story is complete, choose an engaging and deep title that reflects the essence and content of the story.
    "#
}

/// Paragraph budget and its Arabic description for a story length.
pub fn length_instructions(length: StoryLength) -> (usize, &'static str) {
    match length {
        StoryLength::Short => (3, "قصة قصيرة تتكون من 3 فقرات"),
        StoryLength::Medium => (5, "قصة متوسطة الطول تتكون من 5 فقرات"),
        StoryLength::Long => (7, "قصة طويلة تتكون من 7 فقرات"),
    }
}

pub fn story_type_description(primary: StoryType, secondary: StoryType) -> String {
    if secondary == StoryType::None {
        format!("قصة من نوع {}", primary.label())
    } else {
        format!("قصة تجمع بين نوعي {} و{}", primary.label(), secondary.label())
    }
}

pub fn format_characters_info(characters: &[Character]) -> String {
    if characters.is_empty() {
        return "لا توجد شخصيات محددة، يمكنك إنشاء شخصيات مناسبة للقصة.".to_string();
    }

    let mut info = String::from("معلومات الشخصيات:\n");
    for (i, character) in characters.iter().enumerate() {
        info.push_str(&format!(
            "{}. الشخصية: {}، الجنس: {}، الوصف: {}\n",
            i + 1,
            character.name,
            character.gender.label(),
            character.description
        ));
    }
    info
}

pub fn story_init_prompt(config: &StoryConfig) -> String {
    let (_, length_description) = length_instructions(config.length);
    let story_type = story_type_description(config.primary_type, config.secondary_type);
    let characters_info = format_characters_info(&config.characters);

    format!(
        r#"
    Please write {length_description} of {story_type}.

    {characters_info}

    Required from you:
    1. Write the first paragraph of the story (4-6 lines) in Arabic.
    2. Start the story with a strong and engaging beginning that captivates the reader from the first line.
    3. Present the characters and setting (place and time) clearly and interestingly.
    4. Establish a conflict, problem, or situation that drives the story events.
    5. Present 3 short, exciting, and logical options for actions the protagonist can take.
    6. Make the options very short (3-5 words only) and practical and direct.
    7. ALWAYS include the character's name in each option before the action verb.
    8. {OPTION_FORMAT_EXAMPLE}

    Present the first paragraph and options in the following format:

    الفقرة:
    [Write the first paragraph of the story here in Arabic]
    {OPTIONS_LAYOUT}"#
    )
}

/// Whether the paragraph about to be written closes the story.
pub fn is_final_paragraph(current_paragraph: usize, max_paragraphs: usize) -> bool {
    current_paragraph + 1 >= max_paragraphs
}

pub fn continuation_prompt(
    story_context: &str,
    choice_id: u32,
    choice_text: &str,
    current_paragraph: usize,
    max_paragraphs: usize,
) -> String {
    let mut prompt = format!(
        r#"
    Story context so far:
    {story_context}

    The user chose path number {choice_id}: {choice_text}

    Required from you:
    1. Continue writing the story with a new paragraph (4-6 lines) in Arabic that directly follows the choice made by the user.
    2. Do not summarize the choice that the user made; instead, start directly with the events that result from this choice.
    3. Add unexpected and exciting developments to engage the reader.
    4. Maintain consistency in the story's characters and world.
    "#
    );

    if is_final_paragraph(current_paragraph, max_paragraphs) {
        prompt.push_str(
            r#"
    5. This is the final paragraph of the story, so end the story in a logical and satisfying way that closes all open paths.
    6. Suggest an appropriate and deep title for the complete story.

    Present the final paragraph and title in the following format:

    الفقرة:
    [Write the final paragraph of the story here in Arabic]

    العنوان:
    [Write the suggested title for the story here in Arabic]
    "#,
        );
    } else {
        prompt.push_str(&format!(
            r#"
    5. Present 3 short, logical, and practical options for continuing the story.
    6. Make the options very short (3-5 words only) in Arabic.
    7. ALWAYS include the character's name in each option before the action verb.
    8. {OPTION_FORMAT_EXAMPLE}
    9. Make it absolutely clear WHO is performing the action in each option.
    10. Ensure each option will lead to a completely different path in the story.

    Present the next paragraph and options in the following format:

    الفقرة:
    [Write the next paragraph of the story here in Arabic]
    {OPTIONS_LAYOUT}"#
        ));
    }

    prompt
}

pub fn custom_text_prompt(
    story_context: &str,
    custom_text: &str,
    current_paragraph: usize,
    max_paragraphs: usize,
) -> String {
    format!(
        r#"
لقد وصلنا إلى هذه النقطة في القصة:

{story_context}

المستخدم اختار أن يكتب رداً مخصصاً بدلاً من اختيار أحد الخيارات المقدمة. الرد المخصص للمستخدم هو:

"{custom_text}"

بناءً على هذا المدخل من المستخدم، استمر في القصة واكتب فقرة جديدة تأخذ بعين الاعتبار ما كتبه المستخدم.
ثم قدم 3 خيارات جديدة للمستخدم ليختار منها للاستمرار في القصة.

تذكر أن القصة الآن في:
- الفقرة رقم: {current_paragraph} من {max_paragraphs}
- إذا كانت هذه الفقرة الأخيرة أو قبل الأخيرة، قم بختم القصة بشكل مناسب.

يجب أن يكون تنسيق ردك كما يلي:

الفقرة: [نص الفقرة الجديدة من القصة]

الخيارات:
1. [الخيار الأول]
2. [الخيار الثاني]
3. [الخيار الثالث]

إذا كانت هذه الفقرة الأخيرة، أضف عنواناً للقصة:

العنوان: [عنوان مناسب للقصة كاملة]
"#
    )
}

pub fn title_prompt(complete_story: &str) -> String {
    format!(
        r#"
    Here is a complete story:

    {complete_story}

    Suggest an appropriate and engaging title for this story that reflects its essence and content.
    Provide only the title without any additional explanation and without any story Characters names in Arabic.
    "#
    )
}

pub fn edit_system_prompt() -> &'static str {
    "أنت مساعد ذكي متخصص في تحرير وتعديل القصص العربية. مهمتك هي تعديل القصة بناءً على تعليمات المستخدم مع الحفاظ على الأسلوب والنبرة الأصلية. \n\
قم بإرجاع القصة المعدلة بالكامل وليس فقط الأجزاء المعدلة. تأكد من تقسيم القصة إلى فقرات واضحة كما في النص الأصلي.\n\
إذا تطلبت التعليمات تغيير العنوان، قم بإضافة سطر \"العنوان الجديد: <العنوان المعدل>\" في بداية استجابتك."
}

pub fn edit_user_prompt(complete_story: &str, edit_instructions: &str) -> String {
    format!(
        "فيما يلي قصة كاملة:\n\n{complete_story}\n\nتعليمات التعديل:\n{edit_instructions}\n\n\
قم بتعديل القصة وفقًا للتعليمات المذكورة أعلاه وأرجع القصة المعدلة بالكامل مقسمة إلى فقرات.\n"
    )
}
