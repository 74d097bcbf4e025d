//! A self-scrambling 3x3x3 puzzle cube rendered with iced.
//!
//! Every displayed frame advances the puzzle's animation: one layer at a time turns a
//! quarter turn, and the whole puzzle slowly spins in front of the camera.

use std::sync::Arc;

use iced::widget::{Column, Row, Shader, Slider, button, checkbox, container, text};
use iced::{Element, Length, Settings, Subscription, Task, window};
use log::info;

mod camera;
mod cube;
mod kube;
mod layer;
mod math;
mod renderer;
mod shader_widget;
mod shape;
mod world;

use kube::{AnimationConfig, Kube};
use shader_widget::KubeShaderProgram;

/// Application state: the animated puzzle and the controls around it.
#[derive(Debug)]
pub(crate) struct KubeApp {
    kube: Kube,
    paused: bool,
    colors: Arc<[i32]>,
    indices: Arc<[u16]>,
}

#[derive(Debug, Clone)]
pub(crate) enum Message {
    Tick,
    TogglePause,
    SpinSpeed(f32),
    RandomTwists(bool),
    Reset,
}

impl KubeApp {
    pub(crate) fn new(config: AnimationConfig) -> Self {
        let kube = Kube::new(config);
        Self {
            colors: Arc::from(kube.world().colors()),
            indices: Arc::from(kube.world().indices()),
            kube,
            paused: false,
        }
    }

    pub(crate) fn title(&self) -> &'static str {
        "Kube"
    }

    pub(crate) fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::Tick => {
                if !self.paused {
                    self.kube.animate();
                }
            }
            Message::TogglePause => {
                self.paused = !self.paused;
                info!("animation {}", if self.paused { "paused" } else { "resumed" });
            }
            Message::SpinSpeed(value) => {
                let config = AnimationConfig {
                    view_spin_step: value,
                    ..*self.kube.config()
                };
                self.kube.set_config(config);
            }
            Message::RandomTwists(enabled) => {
                let config = AnimationConfig {
                    randomize_twists: enabled,
                    ..*self.kube.config()
                };
                self.kube.set_config(config);
            }
            Message::Reset => {
                info!("resetting puzzle after {} twists", self.kube.completed_twists());
                self.kube = Kube::new(*self.kube.config());
            }
        }

        Task::none()
    }

    pub(crate) fn subscription(&self) -> Subscription<Message> {
        if self.paused {
            Subscription::none()
        } else {
            window::frames().map(|_| Message::Tick)
        }
    }

    fn status(&self) -> String {
        let turning = match self.kube.active_layer() {
            Some(layer) => format!("turning {layer}"),
            None => "idle".to_owned(),
        };
        let solved = if self.kube.permutation().is_identity() {
            ", solved"
        } else {
            ""
        };
        format!(
            "{} twists, {turning}{solved}",
            self.kube.completed_twists()
        )
    }

    pub(crate) fn view(&self) -> Element<Message> {
        let config = self.kube.config();
        let controls = Column::new()
            .spacing(20)
            .width(250)
            .push(
                button(if self.paused { "Resume" } else { "Pause" })
                    .on_press(Message::TogglePause),
            )
            .push(
                Column::new()
                    .spacing(5)
                    .push(text("Spin Speed"))
                    .push(
                        Slider::new(0.0..=5.0, config.view_spin_step, Message::SpinSpeed)
                            .step(0.1),
                    ),
            )
            .push(
                checkbox("Random twists", config.randomize_twists)
                    .on_toggle(Message::RandomTwists),
            )
            .push(button("Reset").on_press(Message::Reset))
            .push(text(self.status()));

        let viewport = Shader::new(KubeShaderProgram::new(
            self.kube.world(),
            Arc::clone(&self.colors),
            Arc::clone(&self.indices),
            self.kube.view_angle(),
        ))
        .width(Length::Fill)
        .height(Length::Fill);

        Row::new()
            .spacing(10)
            .padding(10)
            .push(container(controls).width(Length::Shrink).height(Length::Fill))
            .push(viewport)
            .into()
    }
}

fn main() -> iced::Result {
    env_logger::builder().format_timestamp(None).init();

    let app = KubeApp::new(AnimationConfig::default());
    iced::application(app.title(), KubeApp::update, KubeApp::view)
        .subscription(KubeApp::subscription)
        .settings(Settings {
            antialiasing: true,
            ..Settings::default()
        })
        .run_with(move || (app, Task::none()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app() -> KubeApp {
        KubeApp::new(AnimationConfig {
            seed: Some(3),
            ..AnimationConfig::default()
        })
    }

    #[test]
    fn ticks_are_ignored_while_paused() {
        let mut app = app();
        let _ = app.update(Message::TogglePause);
        let _ = app.update(Message::Tick);
        assert_eq!(app.kube.view_angle(), 0.0);

        let _ = app.update(Message::TogglePause);
        let _ = app.update(Message::Tick);
        assert!(app.kube.view_angle() > 0.0);
        assert!(!app.kube.is_idle());
    }

    #[test]
    fn reset_returns_to_the_solved_state() {
        let mut app = app();
        for _ in 0..200 {
            let _ = app.update(Message::Tick);
        }
        assert!(app.kube.completed_twists() > 0);

        let _ = app.update(Message::Reset);
        assert_eq!(app.kube.completed_twists(), 0);
        assert!(app.kube.permutation().is_identity());
        assert!(app.status().ends_with("idle, solved"));
    }

    #[test]
    fn controls_update_the_animation_config() {
        let mut app = app();
        let _ = app.update(Message::SpinSpeed(2.5));
        let _ = app.update(Message::RandomTwists(true));
        assert_eq!(app.kube.config().view_spin_step, 2.5);
        assert!(app.kube.config().randomize_twists);
    }
}
