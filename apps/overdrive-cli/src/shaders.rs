//! GLSL sources for the model pipeline.
//!
//! Attribute locations follow `overdrive_render::VERTEX_LAYOUT`; sampler
//! names follow `TextureKind::uniform_name`.

pub const MODEL_VS: &str = r#"#version 330 core
layout (location = 0) in vec3 aPos;
layout (location = 1) in vec3 aNormal;
layout (location = 2) in vec2 aTexCoords;
layout (location = 3) in vec3 aTangent;
layout (location = 4) in vec3 aBitangent;
layout (location = 5) in ivec4 aBoneIds;
layout (location = 6) in vec4 aWeights;

out vec2 TexCoords;
out vec3 Normal;

uniform mat4 model;
uniform mat4 view;
uniform mat4 projection;

void main()
{
    TexCoords = aTexCoords;
    Normal = mat3(transpose(inverse(model))) * aNormal;
    gl_Position = projection * view * model * vec4(aPos, 1.0);
}
"#;

pub const MODEL_FS: &str = r#"#version 330 core
out vec4 FragColor;

in vec2 TexCoords;
in vec3 Normal;

uniform sampler2D texture_diffuse1;
uniform bool gamma;

void main()
{
    vec3 color = texture(texture_diffuse1, TexCoords).rgb;
    float light = max(dot(normalize(Normal), normalize(vec3(0.3, 1.0, 0.5))), 0.15);
    color *= light;
    if (gamma)
        color = pow(color, vec3(1.0 / 2.2));
    FragColor = vec4(color, 1.0);
}
"#;
