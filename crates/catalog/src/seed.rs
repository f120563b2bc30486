//! Products the shop opens with.

use crate::product::{NewProduct, ProductKind};

pub fn initial_catalog() -> Vec<NewProduct> {
    vec![
        NewProduct::new("Розы", 220, ProductKind::SingleFlower)
            .with_description("🌹 Классические красные розы. Символ страсти и любви.")
            .with_image("https://i.pinimg.com/736x/a1/b1/f5/a1b1f520076d41d57fffa1a97b2432fa.jpg"),
        NewProduct::new("Тюльпаны", 180, ProductKind::SingleFlower)
            .with_description("🌷 Весенние тюльпаны. Нежность и свежесть.")
            .with_image("https://i.pinimg.com/736x/2f/80/12/2f8012ee7b7e649aeea32b472e97d669.jpg"),
        NewProduct::new("Лилии", 195, ProductKind::SingleFlower)
            .with_description("🌿 Ароматные белые лилии. Благородство и чистота.")
            .with_image("https://i.pinimg.com/736x/04/d2/2a/04d22ad42556fbc8958454b91cc52f34.jpg"),
        NewProduct::new("10 роз букет", 2100, ProductKind::FixedBouquet)
            .with_description("💐 Классический букет из 10 красных роз.")
            .with_image("https://i.pinimg.com/736x/2d/50/bd/2d50bdb45a4a90734c96615b3e5577eb.jpg"),
        NewProduct::new("Белые розы", 230, ProductKind::SingleFlower)
            .with_description("🤍 Белоснежные розы для самых искренних чувств.")
            .with_image("https://i.pinimg.com/736x/30/63/cd/3063cd2f13c5d5656c7dec0d251bf50b.jpg"),
        NewProduct::new("Ранункулюсы", 210, ProductKind::SingleFlower)
            .with_description("🌸 Воздушные ранункулюсы, похожие на пионы.")
            .with_image("https://i.pinimg.com/736x/8e/0a/e3/8e0ae31cb1071b9ae0a4f7c7f05005b0.jpg"),
        NewProduct::new("Дикие розы", 240, ProductKind::SingleFlower)
            .with_description("🍃 Кустовые розы. Ощущение дикого сада.")
            .with_image("https://i.pinimg.com/736x/38/f0/46/38f04649b917733f1e700acba85eaa17.jpg"),
        NewProduct::new("Авторский микс", 4200, ProductKind::FixedBouquet)
            .with_description("✨ Большой сборный букет из разных цветов.")
            .with_image("https://i.pinimg.com/736x/c4/42/80/c442805bebc631f901c16eba044b656d.jpg"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn seed_is_valid_and_has_unique_names() {
        let products = initial_catalog();
        let names: HashSet<_> = products.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names.len(), products.len());
        for p in &products {
            p.validate().unwrap();
            assert_ne!(p.kind, ProductKind::ComposedBouquet);
        }
    }
}
